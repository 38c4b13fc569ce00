//! Upgrade request and response payloads.

use std::collections::BTreeMap;

use demon_brain::{IntentType, QueryAnalysis, SelectionPlan};
use demon_config::MAX_TECHNIQUES_LIMIT;
use demon_primitives::{Difficulty, RequestId, Tier};
use demon_router::RouteDecision;
use demon_telemetry::ExplanationTrace;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A prompt to upgrade plus the context it was sent from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    /// Raw user text, directives included.
    pub text: String,
    /// Routing intent such as `chat`, `editor` or `agent`.
    #[serde(default)]
    pub intent: Option<String>,
    /// Requested tier.
    #[serde(default)]
    pub mode: Option<Tier>,
    /// Calling surface such as `chrome` or `vscode`.
    #[serde(default)]
    pub client: Option<String>,
    /// Whether the caller holds a pro plan.
    #[serde(default)]
    pub user_is_pro: bool,
    /// Opaque caller metadata, recorded on the `upgrade` tracing span.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    /// Attach an [`ExplanationTrace`] to the response.
    #[serde(default)]
    pub explain: bool,
    /// Overrides the configured technique limit.
    #[serde(default)]
    pub max_techniques: Option<usize>,
}

impl UpgradeRequest {
    /// Request for `text` with every other field defaulted.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Sets the routing intent.
    #[must_use]
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// Sets the requested tier.
    #[must_use]
    pub fn with_mode(mut self, mode: Tier) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the calling surface.
    #[must_use]
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    /// Marks the caller as a pro subscriber.
    #[must_use]
    pub fn with_pro(mut self, user_is_pro: bool) -> Self {
        self.user_is_pro = user_is_pro;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Requests an explanation trace.
    #[must_use]
    pub fn with_explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    /// Overrides the technique limit.
    #[must_use]
    pub fn with_max_techniques(mut self, max: usize) -> Self {
        self.max_techniques = Some(max);
        self
    }

    /// Checks the request before any work is done.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRequest`] for blank text or a technique limit
    /// outside `1..=32`.
    pub fn validate(&self) -> EngineResult<()> {
        if self.text.trim().is_empty() {
            return Err(EngineError::invalid("text must not be empty"));
        }
        if let Some(max) = self.max_techniques {
            if !(1..=MAX_TECHNIQUES_LIMIT).contains(&max) {
                return Err(EngineError::invalid(format!(
                    "max_techniques must be between 1 and {MAX_TECHNIQUES_LIMIT}, got {max}"
                )));
            }
        }
        Ok(())
    }
}

/// The parts of a [`QueryAnalysis`] worth returning to callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisSummary {
    /// Detected intent.
    pub intent_type: IntentType,
    /// Estimated difficulty.
    pub complexity_level: Difficulty,
    /// Requested output format.
    pub output_format_requested: Option<String>,
    /// Requested tone.
    pub tone_requested: Option<String>,
    /// Terms to avoid.
    pub constraints: Vec<String>,
    /// Directive names found in the text.
    pub directives: Vec<String>,
    /// Intent confidence.
    pub confidence_score: f64,
    /// False when the embedding step degraded to lexical matching.
    pub embedded: bool,
}

impl From<&QueryAnalysis> for AnalysisSummary {
    fn from(analysis: &QueryAnalysis) -> Self {
        Self {
            intent_type: analysis.intent_type,
            complexity_level: analysis.complexity_level,
            output_format_requested: analysis.output_format_requested.clone(),
            tone_requested: analysis.tone_requested.clone(),
            constraints: analysis.constraints.clone(),
            directives: analysis.directive_names().map(str::to_owned).collect(),
            confidence_score: analysis.confidence_score,
            embedded: analysis.is_embedded(),
        }
    }
}

/// Result of one upgrade.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpgradeResponse {
    /// Identifier for correlating logs.
    pub request_id: RequestId,
    /// Prompt composed from the chosen techniques.
    pub upgraded_prompt: String,
    /// Pipeline the request was routed to.
    pub route: RouteDecision,
    /// Technique selection.
    pub plan: SelectionPlan,
    /// What the analyzer found.
    pub analysis: AnalysisSummary,
    /// Lexical fidelity of the upgraded prompt to the request.
    pub fidelity_score: f64,
    /// One-line summary naming the output contract.
    pub message: String,
    /// Present when the request asked to explain.
    pub explanation: Option<ExplanationTrace>,
}
