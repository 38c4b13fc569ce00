//! Request orchestration for the Demon Engine.
//!
//! [`DemonEngine::upgrade`] runs one request through the whole flow: analyze the
//! text, route it to a pipeline, select techniques under the tier's budget,
//! compose the upgraded prompt, and score its fidelity. The whole run is bounded
//! by the configured request deadline.

#![warn(missing_docs, clippy::pedantic)]

mod engine;
mod error;
mod request;

pub use engine::{DemonEngine, DemonEngineBuilder};
pub use error::{EngineError, EngineResult};
pub use request::{AnalysisSummary, UpgradeRequest, UpgradeResponse};
