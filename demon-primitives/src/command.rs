//! Parsed inline directives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A directive such as `/structure n=2` extracted from user text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    args: BTreeMap<String, String>,
}

impl Command {
    /// Creates a command without arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDirective`] unless `name` is `/` followed by one or
    /// more ASCII letters, underscores, or dashes.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_directive_token(&name) {
            return Err(Error::InvalidDirective { name });
        }
        Ok(Self {
            name,
            args: BTreeMap::new(),
        })
    }

    /// Adds an argument and returns the updated command.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_arg(key, value);
        self
    }

    /// Inserts an argument, replacing any previous value for the key.
    pub fn insert_arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.args.insert(key.into(), value.into());
    }

    /// Directive name including the leading slash.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directive name without the leading slash.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        &self.name[1..]
    }

    /// Returns the value bound to `key`.
    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Returns all arguments.
    #[must_use]
    pub fn args(&self) -> &BTreeMap<String, String> {
        &self.args
    }
}

/// Returns true when `token` has the `/[A-Za-z_-]+` shape.
#[must_use]
pub fn is_directive_token(token: &str) -> bool {
    match token.strip_prefix('/') {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .chars()
                    .all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_directive_shape() {
        assert!(is_directive_token("/structure"));
        assert!(is_directive_token("/chain_of-thought"));
        assert!(!is_directive_token("/"));
        assert!(!is_directive_token("/n2"));
        assert!(!is_directive_token("structure"));
    }

    #[test]
    fn last_argument_wins() {
        let mut cmd = Command::new("/clean").unwrap().with_arg("n", "1");
        cmd.insert_arg("n", "2");
        assert_eq!(cmd.arg("n"), Some("2"));
        assert_eq!(cmd.bare_name(), "clean");
    }

    #[test]
    fn rejects_bad_names() {
        assert!(Command::new("clean").is_err());
    }
}
