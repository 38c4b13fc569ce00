//! The validated technique catalog.
//!
//! A [`Compendium`] is built once, validated as a whole, and never mutated
//! afterwards. Reloading means building a new value and swapping the shared
//! `Arc` that readers hold.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use demon_embeddings::EmbeddingVector;
use demon_primitives::{Category, Difficulty, Phase, TechniqueId, Tier, is_directive_token};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{CompendiumError, CompendiumResult};
use crate::scoring::{Penalty, ScoringWeights, Signal};
use crate::technique::{TechniqueCore, normalize_directive};

const BUILTIN: &str = include_str!("../data/compendium.json");

/// Immutable catalog of techniques plus scoring and budget configuration.
#[derive(Clone, Debug)]
pub struct Compendium {
    techniques: Vec<TechniqueCore>,
    by_id: HashMap<TechniqueId, usize>,
    commands: BTreeMap<String, Vec<TechniqueId>>,
    budgets: BTreeMap<Tier, f64>,
    weights: ScoringWeights,
}

impl Compendium {
    /// Returns a builder for assembling a compendium in code.
    #[must_use]
    pub fn builder() -> CompendiumBuilder {
        CompendiumBuilder::default()
    }

    /// The catalog shipped with the engine.
    ///
    /// # Errors
    ///
    /// Returns [`CompendiumError`] if the bundled document fails validation.
    pub fn builtin() -> CompendiumResult<Self> {
        Self::from_json_str(BUILTIN)
    }

    /// Parses and validates a compendium document.
    ///
    /// # Errors
    ///
    /// Returns [`CompendiumError::Parse`] for malformed JSON and the validation
    /// variants for documents that break catalog invariants.
    pub fn from_json_str(json: &str) -> CompendiumResult<Self> {
        let file: CompendiumFile = serde_json::from_str(json)?;
        file.into_builder()?.build()
    }

    /// Reads and validates a compendium file.
    ///
    /// # Errors
    ///
    /// Returns [`CompendiumError::Io`] when the file cannot be read, otherwise as
    /// [`Compendium::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> CompendiumResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CompendiumError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let compendium = Self::from_json_str(&json)?;
        debug!(path = %path.display(), techniques = compendium.len(), "loaded compendium");
        Ok(compendium)
    }

    /// All techniques in document order.
    #[must_use]
    pub fn techniques(&self) -> &[TechniqueCore] {
        &self.techniques
    }

    /// Number of techniques.
    #[must_use]
    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    /// True when the catalog holds no techniques.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }

    /// Looks up a technique by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TechniqueCore> {
        self.by_id.get(id).map(|idx| &self.techniques[*idx])
    }

    /// Techniques whose aliases match `directive`, in document order.
    #[must_use]
    pub fn by_alias(&self, directive: &str) -> Vec<&TechniqueCore> {
        self.techniques
            .iter()
            .filter(|technique| technique.matches_alias(directive))
            .collect()
    }

    /// Technique ids mapped from `directive` via `pfcl.commands`.
    #[must_use]
    pub fn directive_targets(&self, directive: &str) -> &[TechniqueId] {
        self.commands
            .get(&command_key(directive))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Directive names configured in `pfcl.commands`.
    pub fn directives(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Token budget for `tier`; a missing tier uses the free budget, else zero.
    #[must_use]
    pub fn budget(&self, tier: Tier) -> f64 {
        self.budgets
            .get(&tier)
            .or_else(|| self.budgets.get(&Tier::Free))
            .copied()
            .unwrap_or(0.0)
    }

    /// Effective weight of `signal`.
    #[must_use]
    pub fn signal_weight(&self, signal: Signal) -> f64 {
        self.weights.signal(signal)
    }

    /// Effective weight of `penalty`.
    #[must_use]
    pub fn penalty_weight(&self, penalty: Penalty) -> f64 {
        self.weights.penalty(penalty)
    }

    /// Scoring weights.
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Techniques without a description embedding.
    pub fn missing_embeddings(&self) -> impl Iterator<Item = &TechniqueCore> {
        self.techniques
            .iter()
            .filter(|technique| technique.description_embedding.is_none())
    }

    /// Returns a copy with the supplied description embeddings attached.
    ///
    /// Ids not present in the catalog are ignored.
    #[must_use]
    pub fn with_description_embeddings(
        &self,
        embeddings: impl IntoIterator<Item = (TechniqueId, EmbeddingVector)>,
    ) -> Self {
        let mut next = self.clone();
        for (id, vector) in embeddings {
            if let Some(idx) = next.by_id.get(&id) {
                next.techniques[*idx].description_embedding = Some(vector);
            }
        }
        next
    }
}

/// Assembles and validates a [`Compendium`].
#[derive(Debug, Default)]
pub struct CompendiumBuilder {
    techniques: Vec<TechniqueCore>,
    commands: Vec<(String, Vec<TechniqueId>)>,
    budgets: BTreeMap<Tier, f64>,
    weights: ScoringWeights,
}

impl CompendiumBuilder {
    /// Adds a technique.
    #[must_use]
    pub fn technique(mut self, technique: TechniqueCore) -> Self {
        self.techniques.push(technique);
        self
    }

    /// Maps a directive to technique ids.
    #[must_use]
    pub fn command(mut self, directive: &str, maps_to: Vec<TechniqueId>) -> Self {
        self.commands.push((directive.to_owned(), maps_to));
        self
    }

    /// Sets the token budget of `tier`.
    #[must_use]
    pub fn budget(mut self, tier: Tier, tokens: f64) -> Self {
        self.budgets.insert(tier, tokens);
        self
    }

    /// Sets the scoring weights.
    #[must_use]
    pub fn weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Validates the catalog and freezes it.
    ///
    /// # Errors
    ///
    /// Returns [`CompendiumError`] when ids repeat, a directive references an
    /// unknown technique, or a cost, score, budget, or weight is out of range.
    pub fn build(self) -> CompendiumResult<Compendium> {
        let mut by_id = HashMap::with_capacity(self.techniques.len());
        for (idx, technique) in self.techniques.iter().enumerate() {
            let path = format!("techniques[{idx}]");
            if by_id.insert(technique.id.clone(), idx).is_some() {
                return Err(CompendiumError::DuplicateTechniqueId {
                    id: technique.id.to_string(),
                    path: format!("{path}.id"),
                });
            }
            check_non_negative(
                technique.estimated_tokens,
                &format!("{path}.cost_estimate.tokens"),
            )?;
            check_unit(technique.success_rate, &format!("{path}.success_rate"))?;
            check_unit(
                technique.performance_score,
                &format!("{path}.performance_score"),
            )?;
        }

        let mut commands = BTreeMap::new();
        for (directive, maps_to) in self.commands {
            let key = command_key(&directive);
            if !is_directive_token(&key) {
                return Err(CompendiumError::invalid(
                    format!("pfcl.commands.{directive}"),
                    "directive names must look like /name",
                ));
            }
            for (pos, id) in maps_to.iter().enumerate() {
                if !by_id.contains_key(id) {
                    return Err(CompendiumError::UnknownTechniqueReference {
                        id: id.to_string(),
                        path: format!("pfcl.commands.{directive}.maps_to[{pos}]"),
                    });
                }
            }
            commands.insert(key, maps_to);
        }

        for (tier, tokens) in &self.budgets {
            check_non_negative(*tokens, &format!("defaults.budget_tokens.{tier}"))?;
        }
        for signal in Signal::ALL {
            check_non_negative(
                self.weights.signal(*signal),
                &format!("scoring.signals.{signal}"),
            )?;
        }
        for penalty in Penalty::ALL {
            check_non_negative(
                self.weights.penalty(*penalty),
                &format!("scoring.penalties.{penalty}"),
            )?;
        }

        Ok(Compendium {
            techniques: self.techniques,
            by_id,
            commands,
            budgets: self.budgets,
            weights: self.weights,
        })
    }
}

fn command_key(directive: &str) -> String {
    format!("/{}", normalize_directive(directive))
}

fn check_non_negative(value: f64, path: &str) -> CompendiumResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CompendiumError::invalid(
            path,
            format!("expected a finite non-negative number, got {value}"),
        ))
    }
}

fn check_unit(value: f64, path: &str) -> CompendiumResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CompendiumError::invalid(
            path,
            format!("expected a value in [0, 1], got {value}"),
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompendiumFile {
    defaults: DefaultsSection,
    pfcl: PfclSection,
    scoring: ScoringSection,
    techniques: Vec<TechniqueRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DefaultsSection {
    budget_tokens: BTreeMap<String, f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PfclSection {
    commands: BTreeMap<String, CommandMapping>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommandMapping {
    maps_to: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScoringSection {
    signals: BTreeMap<String, f64>,
    penalties: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct CostEstimate {
    tokens: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PhaseList {
    One(Phase),
    Many(Vec<Phase>),
}

impl Default for PhaseList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl From<PhaseList> for Vec<Phase> {
    fn from(value: PhaseList) -> Self {
        match value {
            PhaseList::One(phase) => vec![phase],
            PhaseList::Many(phases) => phases,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TechniqueRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Category,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    template: String,
    #[serde(default)]
    example: String,
    #[serde(default)]
    use_cases: Vec<String>,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    estimated_tokens: Option<f64>,
    #[serde(default)]
    cost_estimate: Option<CostEstimate>,
    #[serde(default)]
    performance_score: Option<f64>,
    #[serde(default)]
    success_rate: Option<f64>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    complementary_techniques: Vec<String>,
    #[serde(default)]
    conflicts_with: Vec<String>,
    #[serde(default)]
    usage_frequency: u64,
    #[serde(default)]
    description_embedding: Option<Vec<f32>>,
    #[serde(default, alias = "phases")]
    phase: PhaseList,
    #[serde(default)]
    surfaces: Vec<String>,
}

impl CompendiumFile {
    fn into_builder(self) -> CompendiumResult<CompendiumBuilder> {
        let mut builder = CompendiumBuilder::default();

        for (name, tokens) in self.defaults.budget_tokens {
            let tier = name.parse::<Tier>().map_err(|err| {
                CompendiumError::invalid(format!("defaults.budget_tokens.{name}"), err.to_string())
            })?;
            builder = builder.budget(tier, tokens);
        }

        let mut weights = ScoringWeights::default();
        for (name, weight) in self.scoring.signals {
            match Signal::from_name(&name) {
                Some(signal) => weights = weights.with_signal(signal, weight),
                None => warn!(signal = %name, "ignoring unknown scoring signal"),
            }
        }
        for (name, weight) in self.scoring.penalties {
            match Penalty::from_name(&name) {
                Some(penalty) => weights = weights.with_penalty(penalty, weight),
                None => warn!(penalty = %name, "ignoring unknown scoring penalty"),
            }
        }
        builder = builder.weights(weights);

        for (idx, record) in self.techniques.into_iter().enumerate() {
            builder = builder.technique(record.into_technique(&format!("techniques[{idx}]"))?);
        }

        for (directive, mapping) in self.pfcl.commands {
            let path = format!("pfcl.commands.{directive}.maps_to");
            let ids = parse_ids(mapping.maps_to, &path)?;
            builder = builder.command(&directive, ids.into_iter().collect());
        }

        Ok(builder)
    }
}

impl TechniqueRecord {
    fn into_technique(self, path: &str) -> CompendiumResult<TechniqueCore> {
        let id = TechniqueId::new(self.id)
            .map_err(|err| CompendiumError::invalid(format!("{path}.id"), err.to_string()))?;

        let estimated_tokens = match (self.cost_estimate, self.estimated_tokens) {
            (Some(cost), _) => cost.tokens,
            (None, Some(tokens)) => tokens,
            (None, None) => 0.0,
        };

        let description_embedding = self
            .description_embedding
            .map(EmbeddingVector::new)
            .transpose()
            .map_err(|err| {
                CompendiumError::invalid(format!("{path}.description_embedding"), err.to_string())
            })?;

        let mut technique = TechniqueCore::new(id);
        if let Some(name) = self.name.filter(|name| !name.trim().is_empty()) {
            technique.name = name;
        }
        technique.description = self.description;
        technique.category = self.category;
        technique.tags = self.tags.into_iter().map(|tag| tag.to_lowercase()).collect();
        technique.template = self.template;
        technique.example = self.example;
        technique.use_cases = self.use_cases;
        technique.difficulty = self.difficulty;
        technique.estimated_tokens = estimated_tokens;
        technique.performance_score = self.performance_score.unwrap_or(0.5);
        technique.success_rate = self.success_rate.unwrap_or(0.0);
        technique.aliases = self.aliases.into_iter().collect();
        technique.complementary_techniques = parse_ids(
            self.complementary_techniques,
            &format!("{path}.complementary_techniques"),
        )?;
        technique.conflicts_with =
            parse_ids(self.conflicts_with, &format!("{path}.conflicts_with"))?;
        technique.usage_frequency = self.usage_frequency;
        technique.description_embedding = description_embedding;
        technique.phases = self.phase.into();
        technique.surfaces = self
            .surfaces
            .into_iter()
            .map(|surface| surface.trim().to_ascii_lowercase())
            .collect();
        Ok(technique)
    }
}

fn parse_ids(raw: Vec<String>, path: &str) -> CompendiumResult<BTreeSet<TechniqueId>> {
    raw.into_iter()
        .enumerate()
        .map(|(pos, id)| {
            TechniqueId::new(id)
                .map_err(|err| CompendiumError::invalid(format!("{path}[{pos}]"), err.to_string()))
        })
        .collect()
}
