//! Global `tracing` subscriber installation.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable consulted first for the log filter.
pub const DEMON_LOG_ENV: &str = "DEMON_LOG";
/// Environment variable consulted when [`DEMON_LOG_ENV`] is unset.
pub const RUST_LOG_ENV: &str = "RUST_LOG";

/// Picks the filter directive: `DEMON_LOG`, then `RUST_LOG`, then `default_filter`.
///
/// Blank values are skipped.
pub fn resolve_filter<F>(default_filter: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    [DEMON_LOG_ENV, RUST_LOG_ENV]
        .into_iter()
        .filter_map(&lookup)
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| default_filter.to_owned())
}

/// Installs a fmt subscriber filtered by [`resolve_filter`] over the process
/// environment.
///
/// Returns false when a global subscriber was already installed, which makes it
/// safe to call from tests and embedding applications.
pub fn init_tracing(default_filter: &str) -> bool {
    let directive = resolve_filter(default_filter, |var| std::env::var(var).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn demon_log_wins() {
        let lookup = env(&[("DEMON_LOG", "demon_brain=debug"), ("RUST_LOG", "warn")]);
        assert_eq!(resolve_filter("info", lookup), "demon_brain=debug");
    }

    #[test]
    fn falls_back_to_rust_log_then_default() {
        assert_eq!(resolve_filter("info", env(&[("RUST_LOG", "warn")])), "warn");
        assert_eq!(resolve_filter("info", env(&[("DEMON_LOG", "  ")])), "info");
        assert_eq!(resolve_filter("debug", env(&[])), "debug");
    }

    #[test]
    fn second_install_reports_false() {
        let _ = init_tracing("off");
        assert!(!init_tracing("off"));
    }
}
