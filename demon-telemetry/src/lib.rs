//! Observability for the Demon Engine: subscriber setup and explanation traces.

#![warn(missing_docs, clippy::pedantic)]

pub mod subscriber;
pub mod trace;

pub use subscriber::{DEMON_LOG_ENV, RUST_LOG_ENV, init_tracing, resolve_filter};
pub use trace::{ExplanationTrace, StageTimer, StageTiming};
