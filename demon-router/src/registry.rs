//! The `(intent, tier, client)` pipeline matrix.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use demon_primitives::Tier;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Client value matching any surface.
pub const WILDCARD_CLIENT: &str = "*";
/// Intent assumed when none is supplied.
pub const DEFAULT_INTENT: &str = "chat";

const BUILTIN_PIPELINES: &str = include_str!("../data/pipelines.json");

/// Normalized routing key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    intent: String,
    tier: Tier,
    client: String,
}

impl RouteKey {
    /// Builds a key, trimming and lowercasing text and filling blanks with
    /// `chat` and `*`.
    #[must_use]
    pub fn new(intent: &str, tier: Tier, client: &str) -> Self {
        Self {
            intent: normalize(intent, DEFAULT_INTENT),
            tier,
            client: normalize(client, WILDCARD_CLIENT),
        }
    }

    /// Intent component.
    #[must_use]
    pub fn intent(&self) -> &str {
        &self.intent
    }

    /// Tier component.
    #[must_use]
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Client component.
    #[must_use]
    pub fn client(&self) -> &str {
        &self.client
    }

    /// Same intent and tier with the wildcard client.
    #[must_use]
    pub fn wildcard(&self) -> Self {
        Self {
            intent: self.intent.clone(),
            tier: self.tier,
            client: WILDCARD_CLIENT.to_owned(),
        }
    }

    /// True when the client is the wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.client == WILDCARD_CLIENT
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.intent, self.tier, self.client)
    }
}

fn normalize(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_owned()
    } else {
        value.to_lowercase()
    }
}

/// What a route resolves to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEntry {
    /// Execution pipeline name, e.g. `Conversational.Basic`.
    pub pipeline: String,
    /// Response shape promised by the pipeline.
    pub output_contract: String,
    /// Technique ids the pipeline seeds selection with.
    #[serde(default)]
    pub techniques: Vec<String>,
    /// Safety guards the executor must enable.
    #[serde(default)]
    pub safety: Vec<String>,
    /// Output templates applied by the executor.
    #[serde(default)]
    pub templates: Vec<String>,
    /// Only pro subscribers may run the pipeline.
    #[serde(default)]
    pub requires_pro: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelinesFile {
    pipelines: Vec<PipelineRecord>,
}

#[derive(Deserialize)]
struct PipelineRecord {
    intent: String,
    tier: Tier,
    client: String,
    #[serde(flatten)]
    entry: PipelineEntry,
}

/// Immutable routing matrix. Edits build a new registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<RouteKey, PipelineEntry>,
}

impl Registry {
    /// Registry with no routes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Matrix shipped with the engine.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the bundled document is invalid.
    pub fn builtin() -> RegistryResult<Self> {
        Self::from_json_str(BUILTIN_PIPELINES)
    }

    /// Parses a `{"pipelines": [...]}` document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] for malformed JSON, [`RegistryError::EmptyField`]
    /// for blank fields and [`RegistryError::DuplicateKey`] when two entries collide.
    pub fn from_json_str(json: &str) -> RegistryResult<Self> {
        let file: PipelinesFile = serde_json::from_str(json)?;
        let mut entries = BTreeMap::new();
        for (index, record) in file.pipelines.into_iter().enumerate() {
            for (field, value) in [
                ("intent", record.intent.as_str()),
                ("client", record.client.as_str()),
                ("pipeline", record.entry.pipeline.as_str()),
                ("output_contract", record.entry.output_contract.as_str()),
            ] {
                if value.trim().is_empty() {
                    return Err(RegistryError::EmptyField { index, field });
                }
            }
            let key = RouteKey::new(&record.intent, record.tier, &record.client);
            if entries.contains_key(&key) {
                return Err(RegistryError::DuplicateKey { key });
            }
            entries.insert(key, record.entry);
        }
        Ok(Self { entries })
    }

    /// Reads and parses a pipelines file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] if the file cannot be read, otherwise as
    /// [`Registry::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Returns a copy with `entry` registered under `key`, replacing any existing
    /// entry.
    #[must_use]
    pub fn with_entry(mut self, key: RouteKey, entry: PipelineEntry) -> Self {
        self.entries.insert(key, entry);
        self
    }

    /// Entry registered under exactly `key`.
    #[must_use]
    pub fn get(&self, key: &RouteKey) -> Option<&PipelineEntry> {
        self.entries.get(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &RouteKey> {
        self.entries.keys()
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn keys_are_normalized() {
        let key = RouteKey::new("  Chat ", Tier::Free, "");
        assert_eq!(key.intent(), "chat");
        assert_eq!(key.client(), "*");
        assert!(key.is_wildcard());
        assert_eq!(key.to_string(), "chat/free/*");
        assert_eq!(RouteKey::new("", Tier::Pro, "VSCode").to_string(), "chat/pro/vscode");
    }

    #[test]
    fn builtin_matrix_loads() {
        let registry = Registry::builtin().unwrap();
        let entry = registry
            .get(&RouteKey::new("chat", Tier::Free, "web"))
            .unwrap();
        assert_eq!(entry.pipeline, "Temple.Basic");
        assert!(
            registry
                .keys()
                .any(|key| key.is_wildcard() && key.intent() == "agent")
        );
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let json = r#"{"pipelines": [
            {"intent": "chat", "tier": "free", "client": "*", "pipeline": "A", "output_contract": "x"},
            {"intent": "CHAT", "tier": "free", "client": " * ", "pipeline": "B", "output_contract": "x"}
        ]}"#;
        let err = Registry::from_json_str(json).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey { key } if key.to_string() == "chat/free/*"));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let json = r#"{"pipelines": [
            {"intent": "chat", "tier": "free", "client": "*", "pipeline": " ", "output_contract": "x"}
        ]}"#;
        let err = Registry::from_json_str(json).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyField { index: 0, field: "pipeline" }));

        let err = Registry::from_json_str(r#"{"pipelines": [{"intent": "chat"}]}"#).unwrap_err();
        assert!(matches!(err, RegistryError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pipelines": [{{"intent": "docs", "tier": "pro", "client": "*", "pipeline": "Docs.Pro", "output_contract": "markdown", "techniques": ["structured_outline"], "requires_pro": true}}]}}"#
        )
        .unwrap();

        let registry = Registry::from_path(file.path()).unwrap();
        let entry = registry.get(&RouteKey::new("docs", Tier::Pro, "*")).unwrap();
        assert!(entry.requires_pro);
        assert_eq!(entry.techniques, vec!["structured_outline"]);

        let err = Registry::from_path(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
    }
}
