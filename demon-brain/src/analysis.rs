//! Query analysis results.

use std::fmt;
use std::str::FromStr;

use demon_embeddings::EmbeddingVector;
use demon_primitives::{Category, Command, Difficulty, Error as PrimitiveError};
use serde::{Deserialize, Serialize};

/// What the user is trying to get done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    /// Understand how or why something works.
    Explanation,
    /// Produce new content or plans.
    Creative,
    /// Write, fix, or reason about code.
    Code,
    /// Compare, evaluate, or assess.
    Analysis,
    /// Condense existing material.
    Summarization,
    /// Anything else.
    #[default]
    Conversation,
}

impl IntentType {
    /// Every intent in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::Explanation,
        Self::Creative,
        Self::Code,
        Self::Analysis,
        Self::Summarization,
        Self::Conversation,
    ];

    /// Canonical snake_case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explanation => "explanation",
            Self::Creative => "creative",
            Self::Code => "code",
            Self::Analysis => "analysis",
            Self::Summarization => "summarization",
            Self::Conversation => "conversation",
        }
    }

    /// Technique categories that suit this intent.
    #[must_use]
    pub const fn preferred_categories(self) -> &'static [Category] {
        match self {
            Self::Explanation => &[Category::Reasoning, Category::Foundational],
            Self::Creative => &[Category::CreativeAndGenerative],
            Self::Code => &[Category::StructuredOutput, Category::Verification],
            Self::Analysis => &[Category::Reasoning, Category::Verification],
            Self::Summarization => &[Category::Foundational, Category::StructuredOutput],
            Self::Conversation => &[Category::Foundational],
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentType {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|intent| intent.as_str() == normalized)
            .ok_or_else(|| PrimitiveError::UnknownVariant {
                kind: "intent",
                value: s.to_owned(),
            })
    }
}

/// Everything the engine learned about a request before selecting techniques.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryAnalysis {
    /// Text exactly as received, directives included.
    pub raw_query: String,
    /// Residual free text, lowercased and trimmed.
    pub cleaned_query: String,
    /// Detected intent.
    pub intent_type: IntentType,
    /// Estimated difficulty.
    pub complexity_level: Difficulty,
    /// Requested output format such as `json` or `markdown`.
    pub output_format_requested: Option<String>,
    /// Requested tone such as `formal`.
    pub tone_requested: Option<String>,
    /// Terms the user asked to avoid.
    pub constraints: Vec<String>,
    /// Directives parsed from the raw query.
    pub pfcl_commands: Vec<Command>,
    /// Embedding of `cleaned_query`; all zeros when embedding failed.
    #[serde(skip)]
    pub query_embedding: EmbeddingVector,
    /// Confidence in the intent classification, in `[0, 1]`.
    pub confidence_score: f64,
}

impl QueryAnalysis {
    /// True when the query embedding carries information.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        !self.query_embedding.is_zero()
    }

    /// Directive names in order of appearance.
    pub fn directive_names(&self) -> impl Iterator<Item = &str> {
        self.pfcl_commands.iter().map(Command::name)
    }
}
