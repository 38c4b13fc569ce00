//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a technique compendium.
///
/// Every variant is fatal: a compendium that fails validation is never served.
#[derive(Debug, Error)]
pub enum CompendiumError {
    /// The compendium file could not be read.
    #[error("failed to read compendium {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the schema.
    #[error("malformed compendium: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two techniques share an identifier.
    #[error("duplicate technique id `{id}` at {path}")]
    DuplicateTechniqueId {
        /// Repeated identifier.
        id: String,
        /// Field path of the second occurrence.
        path: String,
    },

    /// A directive mapping names a technique that does not exist.
    #[error("unknown technique `{id}` referenced at {path}")]
    UnknownTechniqueReference {
        /// Missing identifier.
        id: String,
        /// Field path of the reference.
        path: String,
    },

    /// A field holds a value outside its allowed range or shape.
    #[error("invalid value at {path}: {reason}")]
    InvalidField {
        /// Field path of the offending value.
        path: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl CompendiumError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for compendium operations.
pub type CompendiumResult<T> = Result<T, CompendiumError>;

/// Errors raised while loading [`crate::EngineSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings document is malformed.
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("invalid value `{value}` for {var}")]
    InvalidOverride {
        /// Environment variable name.
        var: &'static str,
        /// Raw value supplied.
        value: String,
    },

    /// A setting is outside its allowed range.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        /// Setting name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Result alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
