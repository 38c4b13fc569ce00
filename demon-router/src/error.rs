//! Routing and registry errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::RouteKey;

/// Expected routing outcomes the caller branches on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// The pipeline is pro-only and the caller asked for the pro tier without a pro plan.
    #[error("pipeline for {key} requires a pro subscription")]
    ProRequired {
        /// Requested key.
        key: RouteKey,
    },

    /// An operator disabled this exact key.
    #[error("route {key} is disabled by kill switch")]
    KillSwitch {
        /// Requested key.
        key: RouteKey,
    },

    /// Neither the exact key nor its client wildcard is registered.
    #[error("no pipeline registered for {key}")]
    PipelineNotFound {
        /// Requested key.
        key: RouteKey,
    },
}

impl RouteError {
    /// Key that was being routed.
    #[must_use]
    pub fn key(&self) -> &RouteKey {
        match self {
            Self::ProRequired { key } | Self::KillSwitch { key } | Self::PipelineNotFound { key } => {
                key
            }
        }
    }
}

/// Result alias for routing.
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors raised while loading a pipeline registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The pipelines file could not be read.
    #[error("failed to read pipelines {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the schema.
    #[error("malformed pipelines document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two entries normalize to the same key.
    #[error("duplicate route {key}")]
    DuplicateKey {
        /// Repeated key.
        key: RouteKey,
    },

    /// A required field is blank.
    #[error("pipelines[{index}].{field} must not be empty")]
    EmptyField {
        /// Position of the entry in the document.
        index: usize,
        /// Blank field.
        field: &'static str,
    },
}

/// Result alias for registry loading.
pub type RegistryResult<T> = Result<T, RegistryError>;
