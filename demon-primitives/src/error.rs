//! Shared error definitions for engine primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the engine primitives.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive engine types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided request identifier could not be parsed.
    #[error("invalid request id: {source}")]
    InvalidRequestId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Technique identifier failed validation.
    #[error("invalid technique id `{id}`: {reason}")]
    InvalidTechniqueId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A directive name did not follow the `/name` shape.
    #[error("invalid directive name `{name}`")]
    InvalidDirective {
        /// The offending directive token.
        name: String,
    },

    /// A string could not be mapped onto one of the closed taxonomy enums.
    #[error("unknown {kind} `{value}`")]
    UnknownVariant {
        /// Name of the enum being parsed (e.g. `tier`).
        kind: &'static str,
        /// Value that failed to parse.
        value: String,
    },
}
