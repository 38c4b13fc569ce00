//! Engine error type.

use std::time::Duration;

use demon_config::{CompendiumError, SettingsError};
use demon_embeddings::EmbeddingError;
use demon_prompts::TemplateError;
use demon_router::{RegistryError, RouteError};
use thiserror::Error;

/// Errors surfaced by [`crate::DemonEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request failed validation before any work was done.
    #[error("invalid upgrade request: {reason}")]
    InvalidRequest {
        /// What was wrong with the request.
        reason: String,
    },

    /// The request did not finish within the configured deadline.
    #[error("upgrade request exceeded its {after:?} deadline")]
    DeadlineExceeded {
        /// Deadline that elapsed.
        after: Duration,
    },

    /// Routing refused the request.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A technique template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The compendium failed to load.
    #[error(transparent)]
    Compendium(#[from] CompendiumError),

    /// The pipelines file failed to load.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Settings failed to load or validate.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The embedding provider could not be constructed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

impl EngineError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
