//! Runtime knobs for the engine.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, SettingsResult};

/// Largest `max_techniques` a request or the defaults may ask for.
pub const MAX_TECHNIQUES_LIMIT: usize = 32;

const ENV_EMBEDDING_TIMEOUT: &str = "DEMON_EMBEDDING_TIMEOUT_MS";
const ENV_REQUEST_DEADLINE: &str = "DEMON_REQUEST_DEADLINE_MS";
const ENV_MAX_TECHNIQUES: &str = "DEMON_MAX_TECHNIQUES";
const ENV_MIN_SELECTION_SCORE: &str = "DEMON_MIN_SELECTION_SCORE";
const ENV_LOG: &str = "DEMON_LOG";

/// Engine settings loaded from JSON with environment overrides.
///
/// # Examples
///
/// ```
/// use demon_config::EngineSettings;
///
/// let settings = EngineSettings::from_json_str(r#"{"default_max_techniques": 3}"#).unwrap();
/// assert_eq!(settings.default_max_techniques, 3);
/// assert_eq!(settings.embedding_timeout_ms, 250);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Upper bound on a single embedding call.
    pub embedding_timeout_ms: u64,
    /// Upper bound on a whole upgrade request.
    pub request_deadline_ms: u64,
    /// Technique limit when a request does not set one.
    pub default_max_techniques: usize,
    /// Implicit candidates scoring below this are not chosen.
    pub min_selection_score: f64,
    /// Minimum cosine similarity for a technique to become a semantic candidate.
    pub semantic_candidate_threshold: f64,
    /// Dimensionality of the built-in hashing embedder.
    pub embedding_dimensions: usize,
    /// Default `tracing` filter directive.
    pub log_filter: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            embedding_timeout_ms: 250,
            request_deadline_ms: 2_000,
            default_max_techniques: 5,
            min_selection_score: 0.05,
            semantic_candidate_threshold: 0.35,
            embedding_dimensions: 384,
            log_filter: "info".to_owned(),
        }
    }
}

impl EngineSettings {
    /// Parses and validates settings; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] for malformed JSON or unknown fields and
    /// [`SettingsError::Invalid`] for out-of-range values.
    pub fn from_json_str(json: &str) -> SettingsResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and validates a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, otherwise as
    /// [`EngineSettings::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Applies `DEMON_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// See [`EngineSettings::with_overrides`].
    pub fn with_env_overrides(self) -> SettingsResult<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies `DEMON_*` overrides resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidOverride`] when a variable does not parse
    /// and [`SettingsError::Invalid`] when the result fails validation.
    pub fn with_overrides<F>(mut self, lookup: F) -> SettingsResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = parse_override(&lookup, ENV_EMBEDDING_TIMEOUT)? {
            self.embedding_timeout_ms = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_REQUEST_DEADLINE)? {
            self.request_deadline_ms = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_MAX_TECHNIQUES)? {
            self.default_max_techniques = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_MIN_SELECTION_SCORE)? {
            self.min_selection_score = value;
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|value| !value.trim().is_empty()) {
            self.log_filter = filter;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks every setting against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.embedding_timeout_ms == 0 {
            return Err(invalid("embedding_timeout_ms", "must be greater than zero"));
        }
        if self.request_deadline_ms == 0 {
            return Err(invalid("request_deadline_ms", "must be greater than zero"));
        }
        if !(1..=MAX_TECHNIQUES_LIMIT).contains(&self.default_max_techniques) {
            return Err(invalid(
                "default_max_techniques",
                format!("must be between 1 and {MAX_TECHNIQUES_LIMIT}"),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_selection_score) {
            return Err(invalid("min_selection_score", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.semantic_candidate_threshold) {
            return Err(invalid(
                "semantic_candidate_threshold",
                "must be within [0, 1]",
            ));
        }
        if self.embedding_dimensions == 0 {
            return Err(invalid("embedding_dimensions", "must be greater than zero"));
        }
        Ok(())
    }

    /// Embedding timeout as a [`Duration`].
    #[must_use]
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_millis(self.embedding_timeout_ms)
    }

    /// Request deadline as a [`Duration`].
    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }
}

fn parse_override<F, T>(lookup: &F, var: &'static str) -> SettingsResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| SettingsError::InvalidOverride { var, value: raw })
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = EngineSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.embedding_timeout(), Duration::from_millis(250));
        assert_eq!(settings.request_deadline(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = EngineSettings::from_json_str(r#"{"turbo": true}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = EngineSettings::from_json_str(r#"{"default_max_techniques": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "default_max_techniques",
                ..
            }
        ));
        assert!(EngineSettings::from_json_str(r#"{"min_selection_score": 1.5}"#).is_err());
        assert!(EngineSettings::from_json_str(r#"{"embedding_timeout_ms": 0}"#).is_err());
    }

    #[test]
    fn overrides_apply_and_validate() {
        let settings = EngineSettings::default()
            .with_overrides(lookup(&[
                ("DEMON_EMBEDDING_TIMEOUT_MS", "75"),
                ("DEMON_MAX_TECHNIQUES", "3"),
                ("DEMON_LOG", "demon_brain=debug"),
            ]))
            .unwrap();
        assert_eq!(settings.embedding_timeout_ms, 75);
        assert_eq!(settings.default_max_techniques, 3);
        assert_eq!(settings.log_filter, "demon_brain=debug");
        assert_eq!(settings.request_deadline_ms, 2_000);
    }

    #[test]
    fn unparsable_override_is_reported() {
        let err = EngineSettings::default()
            .with_overrides(lookup(&[("DEMON_MIN_SELECTION_SCORE", "high")]))
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidOverride {
                var: "DEMON_MIN_SELECTION_SCORE",
                ..
            }
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"request_deadline_ms": 500}"#).unwrap();
        let settings = EngineSettings::from_path(file.path()).unwrap();
        assert_eq!(settings.request_deadline_ms, 500);
    }
}
