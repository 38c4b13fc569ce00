//! Decision making for the Demon Engine.
//!
//! [`QueryAnalyzer`] classifies a request, [`TechniqueMatcher`] picks a budgeted
//! set of techniques for it, [`determine_execution_order`] sequences them, and the
//! [`validator`] functions judge the model output that comes back.

#![warn(missing_docs, clippy::pedantic)]

pub mod analysis;
pub mod analyzer;
pub mod matcher;
pub mod ordering;
pub mod plan;
pub mod reason;
pub mod validator;

pub use analysis::{IntentType, QueryAnalysis};
pub use analyzer::{DEGRADED_CONFIDENCE_FACTOR, QueryAnalyzer, lexical_analysis};
pub use matcher::{MatcherOptions, SelectionRequest, TechniqueMatcher};
pub use ordering::determine_execution_order;
pub use plan::{
    ADJUSTMENT_CAP, SelectionPlan, SkipReason, SkippedTechnique, TechniqueScore,
    TechniqueSummary,
};
pub use reason::generate_selection_reason;
pub use validator::{
    OutputEvaluation, calculate_fidelity_score, evaluate, try_parse_json, validate_contract,
    validate_output,
};
