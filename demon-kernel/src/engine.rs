//! The request orchestrator.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use demon_brain::{
    MatcherOptions, OutputEvaluation, QueryAnalysis, QueryAnalyzer, SelectionPlan,
    SelectionRequest, TechniqueMatcher, calculate_fidelity_score, evaluate,
};
use demon_config::{Compendium, EngineSettings};
use demon_embeddings::{EmbeddingProvider, HashingEmbedder, embed_with_timeout};
use demon_primitives::RequestId;
use demon_prompts::{DirectiveParser, PromptComposer, PromptFragment, TemplateResult};
use demon_router::{Registry, RouteDecision, Router};
use demon_telemetry::{ExplanationTrace, StageTimer};
use futures::future::join_all;
use tracing::{Instrument, info, info_span, warn};

use crate::error::{EngineError, EngineResult};
use crate::request::{AnalysisSummary, UpgradeRequest, UpgradeResponse};

/// Runs upgrade requests end to end: analyze, route, select, compose, score.
///
/// The compendium is held as an [`Arc`] snapshot; [`DemonEngine::reload_compendium`]
/// swaps in a new one without disturbing requests already in flight.
pub struct DemonEngine {
    settings: EngineSettings,
    analyzer: QueryAnalyzer,
    compendium: RwLock<Arc<Compendium>>,
    router: Router,
    options: MatcherOptions,
}

impl fmt::Debug for DemonEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemonEngine")
            .field("settings", &self.settings)
            .field("model", &self.analyzer.provider().model())
            .field("techniques", &self.compendium().len())
            .field("routes", &self.router.registry().len())
            .finish_non_exhaustive()
    }
}

/// Assembles a [`DemonEngine`]; anything not supplied uses the built-in default.
#[derive(Default)]
pub struct DemonEngineBuilder {
    settings: Option<EngineSettings>,
    compendium: Option<Compendium>,
    registry: Option<Registry>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl DemonEngineBuilder {
    /// Uses `settings` instead of the defaults.
    #[must_use]
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Uses `compendium` instead of the bundled catalog.
    #[must_use]
    pub fn compendium(mut self, compendium: Compendium) -> Self {
        self.compendium = Some(compendium);
        self
    }

    /// Uses `registry` instead of the bundled pipeline matrix.
    #[must_use]
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses `provider` instead of the offline hashing embedder.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Validates settings, loads missing defaults, and embeds technique descriptions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Settings`] for invalid settings, and the compendium,
    /// registry or embedding error if a default fails to load.
    pub async fn build(self) -> EngineResult<DemonEngine> {
        let settings = self.settings.unwrap_or_default();
        settings.validate()?;

        let compendium = match self.compendium {
            Some(compendium) => compendium,
            None => Compendium::builtin()?,
        };
        let registry = match self.registry {
            Some(registry) => registry,
            None => Registry::builtin()?,
        };
        let provider: Arc<dyn EmbeddingProvider> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(HashingEmbedder::new(settings.embedding_dimensions)?),
        };

        let engine = DemonEngine {
            analyzer: QueryAnalyzer::new(provider, settings.embedding_timeout()),
            options: MatcherOptions::from(&settings),
            compendium: RwLock::new(Arc::new(Compendium::builder().build()?)),
            router: Router::new(registry),
            settings,
        };
        engine.reload_compendium(compendium).await;
        Ok(engine)
    }
}

impl DemonEngine {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> DemonEngineBuilder {
        DemonEngineBuilder::default()
    }

    /// Engine with default settings, the bundled catalog and matrix, and the
    /// offline embedder.
    ///
    /// # Errors
    ///
    /// As [`DemonEngineBuilder::build`].
    pub async fn offline() -> EngineResult<Self> {
        Self::builder().build().await
    }

    /// Active settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Current compendium snapshot.
    #[must_use]
    pub fn compendium(&self) -> Arc<Compendium> {
        Arc::clone(&self.compendium.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Routing administration: kill switches and registry swaps.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Query analyzer, for callers that want an analysis without an upgrade.
    #[must_use]
    pub fn analyzer(&self) -> &QueryAnalyzer {
        &self.analyzer
    }

    /// Embeds every technique that lacks a description embedding, then swaps the
    /// result in. Returns how many techniques were embedded; failures are logged
    /// and leave those techniques on lexical matching.
    pub async fn reload_compendium(&self, compendium: Compendium) -> usize {
        let provider = self.analyzer.provider();
        let limit = self.settings.embedding_timeout();
        let pending: Vec<_> = compendium
            .missing_embeddings()
            .map(|technique| (technique.id.clone(), technique.search_text()))
            .collect();

        let results = join_all(pending.into_iter().map(|(id, text)| async move {
            let result = embed_with_timeout(provider.as_ref(), &text, limit).await;
            (id, result)
        }))
        .await;

        let mut embedded = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(vector) => embedded.push((id, vector)),
                Err(err) => warn!(technique = %id, error = %err, "description embedding failed"),
            }
        }
        let count = embedded.len();
        let next = Arc::new(compendium.with_description_embeddings(embedded));

        info!(techniques = next.len(), embedded = count, "compendium loaded");
        *self.compendium.write().unwrap_or_else(PoisonError::into_inner) = next;
        count
    }

    /// Validates the output of a model run against the request and its contract.
    #[must_use]
    pub fn evaluate_output(
        &self,
        output: &str,
        analysis: &QueryAnalysis,
        contract: Option<&str>,
    ) -> OutputEvaluation {
        evaluate(output, analysis, contract)
    }

    /// Upgrades one prompt.
    ///
    /// # Errors
    ///
    /// * [`EngineError::InvalidRequest`] when the request fails validation.
    /// * [`EngineError::Route`] when routing refuses the request.
    /// * [`EngineError::Template`] when a technique template cannot be rendered.
    /// * [`EngineError::DeadlineExceeded`] when the request outlives the deadline.
    pub async fn upgrade(&self, request: UpgradeRequest) -> EngineResult<UpgradeResponse> {
        request.validate()?;

        let request_id = RequestId::random();
        let deadline = self.settings.request_deadline();
        let span = info_span!("upgrade", %request_id, meta = ?request.meta);
        match tokio::time::timeout(deadline, self.run(request_id, &request).instrument(span)).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(%request_id, ?deadline, "upgrade deadline exceeded");
                Err(EngineError::DeadlineExceeded { after: deadline })
            }
        }
    }

    async fn run(
        &self,
        request_id: RequestId,
        request: &UpgradeRequest,
    ) -> EngineResult<UpgradeResponse> {
        let mut trace = ExplanationTrace::new(request_id);

        let timer = StageTimer::start("analyze");
        let analysis = self.analyzer.analyze(&request.text).await;
        timer.finish(&mut trace);

        let route = trace.time("route", || {
            self.router.route(
                request.intent.as_deref(),
                request.mode,
                request.client.as_deref(),
                request.user_is_pro,
            )
        })?;
        trace.matched(format!(
            "route {} -> {} ({})",
            route.resolved, route.matched_pipeline, route.output_contract
        ));
        for directive in analysis.directive_names() {
            trace.matched(format!("directive {directive}"));
        }

        let compendium = self.compendium();
        let tier = route.requested.tier();
        let plan = if route.degraded {
            SelectionPlan::empty(compendium.budget(tier))
        } else {
            let matcher = TechniqueMatcher::new(Arc::clone(&compendium)).with_options(self.options);
            let max_techniques = request
                .max_techniques
                .unwrap_or(self.settings.default_max_techniques);
            trace.time("select", || {
                matcher.select_for(
                    &SelectionRequest::new(&analysis, route.requested.client(), tier)
                        .with_max_techniques(max_techniques)
                        .with_pipeline_techniques(&route.techniques),
                )
            })
        };
        for score in &plan.scores {
            if plan.chosen_ids().any(|id| id == score.technique_id.as_str()) {
                trace.matched(format!(
                    "technique {} ({:.2}): {}",
                    score.technique_id, score.final_score, score.selection_reason
                ));
            }
        }

        let remainder = DirectiveParser::new().parse(&request.text).into_parts().1;
        let upgraded_prompt = trace.time("compose", || compose(&remainder, &analysis, &plan, &route))?;
        let fidelity_score =
            trace.time("fidelity", || calculate_fidelity_score(&upgraded_prompt, &analysis));

        let message = summary_message(&route, &plan);
        info!(
            pipeline = %route.matched_pipeline,
            contract = %route.output_contract,
            techniques = plan.chosen.len(),
            fidelity = fidelity_score,
            elapsed_ms = trace.total_ms(),
            "upgrade complete"
        );

        Ok(UpgradeResponse {
            request_id,
            upgraded_prompt,
            analysis: AnalysisSummary::from(&analysis),
            route,
            plan,
            fidelity_score,
            message,
            explanation: request.explain.then_some(trace),
        })
    }
}

fn compose(
    remainder: &str,
    analysis: &QueryAnalysis,
    plan: &SelectionPlan,
    route: &RouteDecision,
) -> TemplateResult<String> {
    let composer = plan.execution_order().into_iter().fold(
        PromptComposer::new(remainder)
            .with_format(analysis.output_format_requested.as_deref())
            .with_tone(analysis.tone_requested.as_deref())
            .contract(route.output_contract.as_str()),
        |composer, technique| {
            composer.fragment(PromptFragment::new(
                technique.name.as_str(),
                technique.template.as_str(),
            ))
        },
    );
    composer.compose()
}

fn summary_message(route: &RouteDecision, plan: &SelectionPlan) -> String {
    if route.degraded {
        format!(
            "{} requires a pro subscription. Output contract: {}.",
            route.matched_pipeline, route.output_contract
        )
    } else {
        format!(
            "Upgraded with {} technique(s) via {}. Output contract: {}.",
            plan.chosen.len(),
            route.matched_pipeline,
            route.output_contract
        )
    }
}
