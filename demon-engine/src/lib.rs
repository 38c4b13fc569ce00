//! Demon Engine facade.
//!
//! Bundles the engine crates behind feature flags so downstream users can pull in
//! only the parts they need, for example just the router or just the directive
//! parser.

#![warn(missing_docs, clippy::pedantic)]

/// Shared identifiers, directives and taxonomy enums.
pub use demon_primitives as primitives;

/// Request orchestration (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use demon_kernel as kernel;

/// Query analysis, technique selection and output validation (enabled by `brain` feature).
#[cfg(feature = "brain")]
pub use demon_brain as brain;

/// Pipeline routing and kill switches (enabled by `router` feature).
#[cfg(feature = "router")]
pub use demon_router as router;

/// Compendium and settings loading (enabled by `config` feature).
#[cfg(feature = "config")]
pub use demon_config as config;

/// Directive parsing and prompt composition (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use demon_prompts as prompts;

/// Embedding providers (enabled by `embeddings` feature).
#[cfg(feature = "embeddings")]
pub use demon_embeddings as embeddings;

/// Tracing setup and explanation traces (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use demon_telemetry as telemetry;

#[cfg(feature = "kernel")]
pub use demon_kernel::{DemonEngine, EngineError, UpgradeRequest, UpgradeResponse};
