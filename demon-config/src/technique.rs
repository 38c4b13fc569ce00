//! Typed technique records.

use std::collections::BTreeSet;

use demon_embeddings::EmbeddingVector;
use demon_primitives::{Category, Difficulty, Phase, TechniqueId};
use serde::Serialize;

/// A named, costed prompt-transformation unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TechniqueCore {
    /// Unique identifier.
    pub id: TechniqueId,
    /// Display name.
    pub name: String,
    /// What the technique does; embedded for semantic matching.
    pub description: String,
    /// Family, used for intent preference and execution ordering.
    pub category: Category,
    /// Free-form topical tags.
    pub tags: BTreeSet<String>,
    /// Prompt fragment with `{query}`, `{format}`, and `{tone}` placeholders.
    pub template: String,
    /// Illustrative rendering.
    pub example: String,
    /// Situations the technique suits.
    pub use_cases: Vec<String>,
    /// Skill level the technique assumes.
    pub difficulty: Difficulty,
    /// Budget cost.
    pub estimated_tokens: f64,
    /// Offline quality estimate in `[0, 1]`.
    pub performance_score: f64,
    /// Historical success rate in `[0, 1]`.
    pub success_rate: f64,
    /// Directive spellings that request this technique (`cot` matches `/cot`).
    pub aliases: BTreeSet<String>,
    /// Techniques that work well alongside this one.
    pub complementary_techniques: BTreeSet<TechniqueId>,
    /// Techniques that must not be combined with this one.
    pub conflicts_with: BTreeSet<TechniqueId>,
    /// How often the technique has been used; breaks ranking ties.
    pub usage_frequency: u64,
    /// Precomputed embedding of [`TechniqueCore::search_text`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_embedding: Option<EmbeddingVector>,
    /// Phases the technique may run in.
    pub phases: Vec<Phase>,
    /// Client surfaces the technique is offered on; empty means everywhere.
    pub surfaces: BTreeSet<String>,
}

impl TechniqueCore {
    /// Creates a technique with neutral defaults; the name starts as the id.
    #[must_use]
    pub fn new(id: TechniqueId) -> Self {
        Self {
            name: id.as_str().to_owned(),
            id,
            description: String::new(),
            category: Category::default(),
            tags: BTreeSet::new(),
            template: String::new(),
            example: String::new(),
            use_cases: Vec::new(),
            difficulty: Difficulty::default(),
            estimated_tokens: 0.0,
            performance_score: 0.5,
            success_rate: 0.0,
            aliases: BTreeSet::new(),
            complementary_techniques: BTreeSet::new(),
            conflicts_with: BTreeSet::new(),
            usage_frequency: 0,
            description_embedding: None,
            phases: Vec::new(),
            surfaces: BTreeSet::new(),
        }
    }

    /// Declared phase: the earliest listed, or [`Phase::Core`] when none is listed.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phases.iter().copied().min().unwrap_or_default()
    }

    /// True when `directive` names one of the aliases, with or without the slash.
    #[must_use]
    pub fn matches_alias(&self, directive: &str) -> bool {
        let wanted = normalize_directive(directive);
        self.aliases
            .iter()
            .any(|alias| normalize_directive(alias) == wanted)
    }

    /// True when implicit matching may offer this technique on `surface`.
    #[must_use]
    pub fn available_on(&self, surface: &str) -> bool {
        self.surfaces.is_empty()
            || surface == "*"
            || self.surfaces.iter().any(|s| s.eq_ignore_ascii_case(surface))
    }

    /// Text used for embeddings and lexical matching.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.id.as_str(), &self.name, &self.description];
        parts.extend(self.tags.iter().map(String::as_str));
        parts.extend(self.use_cases.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// Canonical form of a directive or alias: trimmed, lowercase, without the slash.
#[must_use]
pub fn normalize_directive(name: &str) -> String {
    name.trim().trim_start_matches('/').to_ascii_lowercase()
}
