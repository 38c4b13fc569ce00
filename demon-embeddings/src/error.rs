//! Error types for embedding providers.

use std::time::Duration;

use thiserror::Error;

/// Errors emitted by embedding components.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Vector data failed validation.
    #[error("invalid embedding vector: {0}")]
    InvalidVector(&'static str),
    /// Provider is misconfigured.
    #[error("embedding provider not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },
    /// The provider did not answer within the allotted time.
    #[error("embedding request timed out after {after:?}")]
    Timeout {
        /// Timeout that elapsed.
        after: Duration,
    },
    /// Network or protocol failure talking to a remote provider.
    #[error("embedding transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },
    /// The provider answered with an error or a malformed payload.
    #[error("embedding provider error: {reason}")]
    Provider {
        /// Human-readable reason describing the failure.
        reason: String,
    },
    /// The provider returned a vector of unexpected dimensionality.
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        /// Dimensions advertised by the provider.
        expected: usize,
        /// Dimensions actually returned.
        actual: usize,
    },
}

impl EmbeddingError {
    /// Helper to construct provider errors from string-like values.
    #[must_use]
    pub fn provider(reason: impl Into<String>) -> Self {
        Self::Provider {
            reason: reason.into(),
        }
    }

    /// Helper to construct transport errors from string-like values.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Helper to construct configuration errors from string-like values.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Result type alias for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
