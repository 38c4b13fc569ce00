//! Core shared types for the Demon Engine.

#![warn(missing_docs, clippy::pedantic)]

mod command;
mod error;
mod ids;
mod taxonomy;
pub mod text;

/// Parsed inline directives.
pub use command::{Command, is_directive_token};
/// Error type and result alias shared across the engine.
pub use error::{Error, Result};
/// Identifiers for techniques and requests.
pub use ids::{RequestId, TechniqueId};
/// Closed enums for technique metadata and entitlement.
pub use taxonomy::{Category, Difficulty, Phase, Tier};
