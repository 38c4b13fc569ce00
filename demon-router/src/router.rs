//! Route resolution over a swappable registry.

use std::sync::{Arc, PoisonError, RwLock};

use demon_primitives::Tier;
use tracing::{debug, info};

use crate::decision::RouteDecision;
use crate::error::{RegistryResult, RouteError, RouteResult};
use crate::killswitch::KillSwitchSet;
use crate::registry::{Registry, RouteKey};

/// Resolves `(intent, tier, client)` to a pipeline.
///
/// The registry is an immutable snapshot behind a lock held only long enough to
/// clone or swap the [`Arc`], so a route never sees a half-applied edit.
#[derive(Debug)]
pub struct Router {
    registry: RwLock<Arc<Registry>>,
    killswitches: KillSwitchSet,
}

impl Router {
    /// Router over `registry` with no kill switches.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: RwLock::new(Arc::new(registry)),
            killswitches: KillSwitchSet::new(),
        }
    }

    /// Router over the bundled matrix.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RegistryError`] if the bundled matrix is invalid.
    pub fn builtin() -> RegistryResult<Self> {
        Ok(Self::new(Registry::builtin()?))
    }

    /// Current registry snapshot.
    #[must_use]
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Kill switch administration.
    #[must_use]
    pub fn features(&self) -> &KillSwitchSet {
        &self.killswitches
    }

    /// Disables the exact `key`.
    pub fn enable_killswitch(&self, key: RouteKey) -> bool {
        self.killswitches.enable(key)
    }

    /// Re-enables the exact `key`.
    pub fn disable_killswitch(&self, key: &RouteKey) -> bool {
        self.killswitches.disable(key)
    }

    /// Atomically swaps in `registry`.
    pub fn replace_registry(&self, registry: Registry) {
        info!(routes = registry.len(), "replacing pipeline registry");
        *self.registry.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(registry);
    }

    /// Swaps in an empty registry; every route then fails with `PipelineNotFound`.
    pub fn reset_registry(&self) {
        self.replace_registry(Registry::empty());
    }

    /// Swaps the bundled matrix back in.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RegistryError`] if the bundled matrix is invalid; the current
    /// registry is left in place.
    pub fn reload_builtin(&self) -> RegistryResult<()> {
        self.replace_registry(Registry::builtin()?);
        Ok(())
    }

    /// Resolves a request. Blank or missing values default to `chat`, free and `*`.
    ///
    /// # Errors
    ///
    /// * [`RouteError::KillSwitch`] when the exact requested key is disabled.
    /// * [`RouteError::ProRequired`] when the pro tier is requested for a pro-only
    ///   pipeline by a caller without a pro plan.
    ///
    /// A pro-only pipeline reached through the free tier resolves to the degraded
    /// upsell stub whatever the caller's plan.
    /// * [`RouteError::PipelineNotFound`] when neither the exact key nor its client
    ///   wildcard is registered.
    pub fn route(
        &self,
        intent: Option<&str>,
        tier: Option<Tier>,
        client: Option<&str>,
        user_is_pro: bool,
    ) -> RouteResult<RouteDecision> {
        let key = RouteKey::new(
            intent.unwrap_or_default(),
            tier.unwrap_or_default(),
            client.unwrap_or_default(),
        );
        self.route_key(key, user_is_pro)
    }

    /// Resolves an already-normalized key.
    ///
    /// # Errors
    ///
    /// As [`Router::route`].
    pub fn route_key(&self, key: RouteKey, user_is_pro: bool) -> RouteResult<RouteDecision> {
        // Checked before lookup so the wildcard cannot bypass a disabled key.
        if self.killswitches.is_enabled(&key) {
            return Err(RouteError::KillSwitch { key });
        }

        let registry = self.registry();
        let (resolved, entry) = if let Some(entry) = registry.get(&key) {
            (key.clone(), entry)
        } else {
            let wildcard = key.wildcard();
            match registry.get(&wildcard) {
                Some(entry) => {
                    debug!(requested = %key, "falling back to wildcard client");
                    (wildcard, entry)
                }
                None => return Err(RouteError::PipelineNotFound { key }),
            }
        };

        if entry.requires_pro {
            match key.tier() {
                Tier::Pro if !user_is_pro => return Err(RouteError::ProRequired { key }),
                Tier::Pro => {}
                // The free tier always gets the upsell stub, whatever the caller's plan.
                Tier::Free => {
                    info!(requested = %key, pipeline = %entry.pipeline, "pro-only pipeline degraded to upsell");
                    return Ok(RouteDecision::pro_upsell(key, resolved, entry));
                }
            }
        }

        info!(
            requested = %key,
            resolved = %resolved,
            pipeline = %entry.pipeline,
            contract = %entry.output_contract,
            "routed request"
        );
        Ok(RouteDecision::matched(key, resolved, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{PRO_ONLY_CONTRACT, PRO_UPSELL_TEMPLATE};
    use crate::registry::PipelineEntry;

    fn router() -> Router {
        Router::builtin().unwrap()
    }

    fn route(router: &Router, intent: &str, tier: Tier, client: &str, pro: bool) -> RouteResult<RouteDecision> {
        router.route(Some(intent), Some(tier), Some(client), pro)
    }

    #[test]
    fn exact_hits() {
        let router = router();
        let decision = route(&router, "chat", Tier::Free, "chrome", false).unwrap();
        assert_eq!(decision.matched_pipeline, "Conversational.Basic");
        assert!(!decision.fallback_used);

        let decision = route(&router, "editor", Tier::Pro, "vscode", true).unwrap();
        assert_eq!(decision.matched_pipeline, "CodeForge.LangGraph");
    }

    #[test]
    fn unknown_client_falls_back_to_wildcard() {
        let router = router();
        let decision = route(&router, "chat", Tier::Free, "unknown", false).unwrap();
        assert_eq!(decision.matched_pipeline, "Conversational.Basic");
        assert!(decision.fallback_used);
        assert_eq!(decision.resolved.to_string(), "chat/free/*");
        assert_eq!(decision.requested.to_string(), "chat/free/unknown");

        let decision = route(&router, "chat", Tier::Free, "web", false).unwrap();
        assert_eq!(decision.matched_pipeline, "Temple.Basic");
        assert!(!decision.fallback_used);
    }

    #[test]
    fn missing_inputs_default_to_chat_free_wildcard() {
        let decision = router().route(None, None, None, false).unwrap();
        assert_eq!(decision.matched_pipeline, "Conversational.Basic");
        assert_eq!(decision.requested.to_string(), "chat/free/*");

        let decision = router().route(Some("  "), None, Some(""), false).unwrap();
        assert_eq!(decision.matched_pipeline, "Conversational.Basic");
    }

    #[test]
    fn pro_tier_without_plan_is_rejected() {
        let err = route(&router(), "agent", Tier::Pro, "cursor", false).unwrap_err();
        assert!(matches!(err, RouteError::ProRequired { .. }));
        assert_eq!(err.key().to_string(), "agent/pro/cursor");
    }

    #[test]
    fn free_tier_on_pro_pipeline_degrades() {
        let decision = route(&router(), "agent", Tier::Free, "cursor", false).unwrap();
        assert!(decision.degraded);
        assert_eq!(decision.output_contract, PRO_ONLY_CONTRACT);
        assert!(decision.techniques.is_empty());
        assert_eq!(decision.templates, vec![PRO_UPSELL_TEMPLATE]);

    }

    #[test]
    fn free_tier_degrades_even_for_pro_users() {
        let router = router();
        let decision = route(&router, "agent", Tier::Free, "cursor", true).unwrap();
        assert!(decision.degraded);
        assert_eq!(decision.output_contract, PRO_ONLY_CONTRACT);
        assert_eq!(decision.matched_pipeline, "Agentic.Orchestrator");
        assert!(decision.techniques.is_empty());

        let decision = route(&router, "chat", Tier::Free, "web", true).unwrap();
        assert!(!decision.degraded);
        assert_eq!(decision.matched_pipeline, "Temple.Basic");

        let decision = route(&router, "agent", Tier::Pro, "cursor", true).unwrap();
        assert!(!decision.degraded);
        assert_eq!(decision.output_contract, "agent_plan");
    }

    #[test]
    fn kill_switch_blocks_only_the_exact_key() {
        let router = router();
        let key = RouteKey::new("chat", Tier::Free, "chrome");
        router.enable_killswitch(key.clone());

        let err = route(&router, "chat", Tier::Free, "chrome", false).unwrap_err();
        assert_eq!(err, RouteError::KillSwitch { key: key.clone() });
        let decision = route(&router, "chat", Tier::Free, "web", false).unwrap();
        assert_eq!(decision.matched_pipeline, "Temple.Basic");
        assert!(route(&router, "chat", Tier::Free, "unknown", false).is_ok());

        router.disable_killswitch(&key);
        assert!(route(&router, "chat", Tier::Free, "chrome", false).is_ok());
    }

    #[test]
    fn kill_switch_on_wildcard_key_blocks_wildcard_requests() {
        let router = router();
        router.features().enable(RouteKey::new("chat", Tier::Free, "*"));
        assert!(router.route(None, None, None, false).is_err());
        assert!(route(&router, "chat", Tier::Free, "chrome", false).is_ok());
    }

    #[test]
    fn cleared_registry_finds_nothing() {
        let router = router();
        router.reset_registry();
        let err = route(&router, "chat", Tier::Free, "chrome", false).unwrap_err();
        assert!(matches!(err, RouteError::PipelineNotFound { .. }));

        router.reload_builtin().unwrap();
        assert!(route(&router, "chat", Tier::Free, "chrome", false).is_ok());
    }

    #[test]
    fn replacement_is_visible_to_later_routes() {
        let router = router();
        let entry = PipelineEntry {
            pipeline: "Docs.Basic".to_owned(),
            output_contract: "paragraphs_and_bullets".to_owned(),
            techniques: vec!["structured_outline".to_owned()],
            safety: Vec::new(),
            templates: Vec::new(),
            requires_pro: false,
        };
        let before = router.registry();
        router.replace_registry(
            Registry::empty().with_entry(RouteKey::new("docs", Tier::Free, "*"), entry),
        );

        assert_eq!(route(&router, "docs", Tier::Free, "web", false).unwrap().matched_pipeline, "Docs.Basic");
        assert!(before.get(&RouteKey::new("chat", Tier::Free, "*")).is_some());
        assert_eq!(router.registry().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_routes_see_whole_registries() {
        let router = Arc::new(router());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let router = Arc::clone(&router);
            handles.push(tokio::spawn(async move {
                for _ in 0..200 {
                    match route(&router, "chat", Tier::Free, "chrome", false) {
                        Ok(decision) => assert_eq!(decision.matched_pipeline, "Conversational.Basic"),
                        Err(err) => assert!(matches!(err, RouteError::PipelineNotFound { .. })),
                    }
                }
            }));
        }
        for _ in 0..50 {
            router.reset_registry();
            router.reload_builtin().unwrap();
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
