//! Scores and selection plans produced by the matcher.

use std::fmt;

use demon_primitives::{Category, Phase, TechniqueId};
use serde::Serialize;

use crate::ordering::determine_execution_order;

/// How well one candidate fits the request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TechniqueScore {
    /// Scored technique.
    pub technique_id: TechniqueId,
    /// Display name.
    pub technique_name: String,
    /// Embedding or lexical similarity in `[0, 1]`.
    pub semantic_score: f64,
    /// Weighted signals, clamped to `[0, 0.5]`.
    pub signal_boost: f64,
    /// Weighted penalties, clamped to `[0, 0.5]`.
    pub penalty_score: f64,
    /// `semantic + boost - penalty`, clamped to `[0, 1]`.
    pub final_score: f64,
    /// Short justification naming the dominant contribution.
    pub selection_reason: String,
}

/// Upper bound for both the signal boost and the penalty.
pub const ADJUSTMENT_CAP: f64 = 0.5;

impl TechniqueScore {
    /// Builds a score, clamping every component into range.
    #[must_use]
    pub fn new(
        technique_id: TechniqueId,
        technique_name: impl Into<String>,
        semantic_score: f64,
        signal_boost: f64,
        penalty_score: f64,
    ) -> Self {
        let semantic_score = semantic_score.clamp(0.0, 1.0);
        let signal_boost = signal_boost.clamp(0.0, ADJUSTMENT_CAP);
        let penalty_score = penalty_score.clamp(0.0, ADJUSTMENT_CAP);
        Self {
            technique_id,
            technique_name: technique_name.into(),
            semantic_score,
            signal_boost,
            penalty_score,
            final_score: (semantic_score + signal_boost - penalty_score).clamp(0.0, 1.0),
            selection_reason: String::new(),
        }
    }

    /// Attaches a selection reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.selection_reason = reason.into();
        self
    }
}

/// A chosen technique with what later stages need to run it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TechniqueSummary {
    /// Technique id.
    pub id: TechniqueId,
    /// Display name.
    pub name: String,
    /// Category, used for ordering.
    pub category: Category,
    /// Declared phase, used for ordering.
    pub phase: Phase,
    /// Budget cost.
    pub estimated_tokens: f64,
    /// Final score at the moment of selection.
    pub final_score: f64,
    /// Prompt fragment to render.
    pub template: String,
    /// Requested by directive or alias rather than matched implicitly.
    pub explicit: bool,
}

/// Why a candidate was not chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Cost exceeded the remaining budget.
    OverBudget,
    /// Conflicts with a technique chosen earlier.
    Conflict,
    /// The per-request technique limit was already reached.
    UsageCap,
    /// Final score fell below the selection floor.
    BelowThreshold,
    /// A pipeline referenced an id the compendium does not contain.
    Unknown,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OverBudget => "over_budget",
            Self::Conflict => "conflict",
            Self::UsageCap => "usage_cap",
            Self::BelowThreshold => "below_threshold",
            Self::Unknown => "unknown",
        })
    }
}

/// A candidate that was considered and dropped.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedTechnique {
    /// Candidate id as written by its source.
    pub id: String,
    /// Why it was dropped.
    pub reason: SkipReason,
}

/// Outcome of technique selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SelectionPlan {
    /// Chosen techniques in selection order.
    pub chosen: Vec<TechniqueSummary>,
    /// Scores of every candidate in ranking order.
    pub scores: Vec<TechniqueScore>,
    /// Candidates that were dropped.
    pub skipped: Vec<SkippedTechnique>,
    /// Directives that matched no technique.
    pub unknown_directives: Vec<String>,
    /// Tokens spent by the chosen techniques.
    pub budget_used: f64,
    /// Tokens available for the tier.
    pub budget_limit: f64,
}

impl SelectionPlan {
    /// An empty plan, used when selection is skipped.
    #[must_use]
    pub fn empty(budget_limit: f64) -> Self {
        Self {
            budget_limit,
            ..Self::default()
        }
    }

    /// Chosen techniques in execution order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&TechniqueSummary> {
        determine_execution_order(&self.chosen)
            .into_iter()
            .map(|idx| &self.chosen[idx])
            .collect()
    }

    /// Ids of the chosen techniques in selection order.
    pub fn chosen_ids(&self) -> impl Iterator<Item = &str> {
        self.chosen.iter().map(|summary| summary.id.as_str())
    }

    /// Score recorded for `id`, if it was a candidate.
    #[must_use]
    pub fn score_of(&self, id: &str) -> Option<&TechniqueScore> {
        self.scores
            .iter()
            .find(|score| score.technique_id.as_str() == id)
    }
}
