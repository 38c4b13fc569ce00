//! Route decisions returned to callers.

use serde::{Deserialize, Serialize};

use crate::registry::{PipelineEntry, RouteKey};

/// Contract reported when a free caller hits a pro-only pipeline.
pub const PRO_ONLY_CONTRACT: &str = "pro_only";
/// Template the executor renders instead of the gated pipeline.
pub const PRO_UPSELL_TEMPLATE: &str = "pro_upsell";

/// Resolved pipeline for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Key as requested, after normalization.
    pub requested: RouteKey,
    /// Key whose entry was used.
    pub resolved: RouteKey,
    /// Pipeline name.
    pub matched_pipeline: String,
    /// Response shape the pipeline promises.
    pub output_contract: String,
    /// Techniques the pipeline seeds selection with.
    pub techniques: Vec<String>,
    /// Safety guards to enable.
    pub safety: Vec<String>,
    /// Output templates to apply.
    pub templates: Vec<String>,
    /// The client wildcard was used instead of an exact entry.
    pub fallback_used: bool,
    /// The pipeline was replaced by the pro upsell stub.
    pub degraded: bool,
}

impl RouteDecision {
    pub(crate) fn matched(
        requested: RouteKey,
        resolved: RouteKey,
        entry: &PipelineEntry,
    ) -> Self {
        let fallback_used = requested != resolved;
        Self {
            requested,
            resolved,
            matched_pipeline: entry.pipeline.clone(),
            output_contract: entry.output_contract.clone(),
            techniques: entry.techniques.clone(),
            safety: entry.safety.clone(),
            templates: entry.templates.clone(),
            fallback_used,
            degraded: false,
        }
    }

    pub(crate) fn pro_upsell(requested: RouteKey, resolved: RouteKey, entry: &PipelineEntry) -> Self {
        Self {
            output_contract: PRO_ONLY_CONTRACT.to_owned(),
            techniques: Vec::new(),
            safety: Vec::new(),
            templates: vec![PRO_UPSELL_TEMPLATE.to_owned()],
            degraded: true,
            ..Self::matched(requested, resolved, entry)
        }
    }
}
