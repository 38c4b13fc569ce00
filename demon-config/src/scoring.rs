//! Signal and penalty weights used by technique scoring.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Positive evidence that a technique fits the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// A parsed directive maps to the technique through `pfcl.commands`.
    PfclCommand,
    /// A parsed directive matches one of the technique's aliases.
    PfclAlias,
    /// The routed pipeline lists the technique.
    PipelineDefault,
    /// The technique's category is preferred for the detected intent.
    CategoryMatch,
    /// Per overlapping tag between the query and the technique (capped at three).
    TagOverlap,
    /// Scaled by the technique's historical success rate.
    SuccessRate,
    /// The technique complements one that is already chosen.
    Complementary,
}

impl Signal {
    /// Every signal in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::PfclCommand,
        Self::PfclAlias,
        Self::PipelineDefault,
        Self::CategoryMatch,
        Self::TagOverlap,
        Self::SuccessRate,
        Self::Complementary,
    ];

    /// Name used in compendium files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PfclCommand => "pfcl_command",
            Self::PfclAlias => "pfcl_alias",
            Self::PipelineDefault => "pipeline_default",
            Self::CategoryMatch => "category_match",
            Self::TagOverlap => "tag_overlap",
            Self::SuccessRate => "success_rate",
            Self::Complementary => "complementary",
        }
    }

    /// Weight applied when the compendium does not configure one.
    #[must_use]
    pub const fn default_weight(self) -> f64 {
        match self {
            Self::PfclCommand => 0.35,
            Self::PfclAlias => 0.30,
            Self::PipelineDefault => 0.20,
            Self::CategoryMatch | Self::SuccessRate | Self::Complementary => 0.10,
            Self::TagOverlap => 0.05,
        }
    }

    /// Looks up a signal by its file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|signal| signal.as_str() == name)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negative evidence against including a technique.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    /// A chosen technique lists this one in `conflicts_with`.
    Conflict,
    /// The plan already holds the per-request technique limit.
    UsageCap,
    /// A query constraint names one of the technique's terms.
    Constraint,
}

impl Penalty {
    /// Every penalty in declaration order.
    pub const ALL: &'static [Self] = &[Self::Conflict, Self::UsageCap, Self::Constraint];

    /// Name used in compendium files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conflict => "conflict",
            Self::UsageCap => "usage_cap",
            Self::Constraint => "constraint",
        }
    }

    /// Weight applied when the compendium does not configure one.
    #[must_use]
    pub const fn default_weight(self) -> f64 {
        match self {
            Self::Conflict => 0.40,
            Self::UsageCap => 0.50,
            Self::Constraint => 0.30,
        }
    }

    /// Looks up a penalty by its file name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|penalty| penalty.as_str() == name)
    }
}

impl fmt::Display for Penalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured weights, falling back to built-in defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoringWeights {
    signals: HashMap<Signal, f64>,
    penalties: HashMap<Penalty, f64>,
}

impl ScoringWeights {
    /// Overrides the weight of `signal`.
    #[must_use]
    pub fn with_signal(mut self, signal: Signal, weight: f64) -> Self {
        self.signals.insert(signal, weight);
        self
    }

    /// Overrides the weight of `penalty`.
    #[must_use]
    pub fn with_penalty(mut self, penalty: Penalty, weight: f64) -> Self {
        self.penalties.insert(penalty, weight);
        self
    }

    /// Effective weight of `signal`.
    #[must_use]
    pub fn signal(&self, signal: Signal) -> f64 {
        self.signals
            .get(&signal)
            .copied()
            .unwrap_or_else(|| signal.default_weight())
    }

    /// Effective weight of `penalty`.
    #[must_use]
    pub fn penalty(&self, penalty: Penalty) -> f64 {
        self.penalties
            .get(&penalty)
            .copied()
            .unwrap_or_else(|| penalty.default_weight())
    }
}
