//! Operator kill switches keyed by exact route.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use tracing::warn;

use crate::registry::RouteKey;

/// Set of disabled route keys.
///
/// Switches match exact keys only; disabling `chat/free/chrome` leaves
/// `chat/free/*` and `chat/free/web` routable.
#[derive(Debug, Default)]
pub struct KillSwitchSet {
    keys: RwLock<HashSet<RouteKey>>,
}

impl KillSwitchSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables `key`. Returns false if it was already disabled.
    pub fn enable(&self, key: RouteKey) -> bool {
        warn!(route = %key, "kill switch enabled");
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    /// Re-enables `key`. Returns false if it was not disabled.
    pub fn disable(&self, key: &RouteKey) -> bool {
        let removed = self
            .keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if removed {
            warn!(route = %key, "kill switch cleared");
        }
        removed
    }

    /// True when `key` is disabled.
    #[must_use]
    pub fn is_enabled(&self, key: &RouteKey) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Disabled keys in sorted order.
    #[must_use]
    pub fn active(&self) -> Vec<RouteKey> {
        let mut keys: Vec<RouteKey> = self
            .keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Clears every switch.
    pub fn clear(&self) {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
