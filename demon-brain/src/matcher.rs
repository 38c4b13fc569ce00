//! Technique scoring and budgeted selection.
//!
//! Selection runs in two phases. Every candidate is first scored against an empty
//! plan and ranked. A single walk over that ranking then rescores each candidate
//! against the techniques chosen so far (complementary bonus, conflict and usage
//! penalties) and keeps it if it still qualifies and fits the remaining budget.
//! The walk is greedy and order dependent: it does not search for the best
//! combination, and a candidate skipped for budget is never reconsidered.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use demon_config::{Compendium, EngineSettings, Penalty, Signal, TechniqueCore};
use demon_embeddings::cosine_similarity;
use demon_primitives::text::{content_terms, stem, tokenize};
use demon_primitives::{Command, TechniqueId, Tier};
use tracing::{debug, info, warn};

use crate::analysis::QueryAnalysis;
use crate::analyzer::lexical_analysis;
use crate::plan::{
    SelectionPlan, SkipReason, SkippedTechnique, TechniqueScore, TechniqueSummary,
};
use crate::reason::dominant_reason;

const BUDGET_EPSILON: f64 = 1e-9;
const MAX_TAG_SIGNALS: usize = 3;

/// Thresholds applied during selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatcherOptions {
    /// Implicit candidates scoring below this are not chosen.
    pub min_selection_score: f64,
    /// Minimum similarity for a technique to become a semantic candidate.
    pub semantic_candidate_threshold: f64,
    /// Technique limit used by [`TechniqueMatcher::select`].
    pub default_max_techniques: usize,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            min_selection_score: 0.05,
            semantic_candidate_threshold: 0.35,
            default_max_techniques: 5,
        }
    }
}

impl From<&EngineSettings> for MatcherOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            min_selection_score: settings.min_selection_score,
            semantic_candidate_threshold: settings.semantic_candidate_threshold,
            default_max_techniques: settings.default_max_techniques,
        }
    }
}

/// Inputs for one selection.
#[derive(Clone, Copy, Debug)]
pub struct SelectionRequest<'a> {
    /// Analysis of the user's query, directives included.
    pub analysis: &'a QueryAnalysis,
    /// Calling client surface, `*` when unknown.
    pub surface: &'a str,
    /// Entitlement tier that selects the budget.
    pub tier: Tier,
    /// Soft cap on the number of chosen techniques.
    pub max_techniques: usize,
    /// Techniques listed by the routed pipeline.
    pub pipeline_techniques: &'a [String],
}

impl<'a> SelectionRequest<'a> {
    /// Request with a limit of five techniques and no pipeline defaults.
    #[must_use]
    pub fn new(analysis: &'a QueryAnalysis, surface: &'a str, tier: Tier) -> Self {
        Self {
            analysis,
            surface,
            tier,
            max_techniques: MatcherOptions::default().default_max_techniques,
            pipeline_techniques: &[],
        }
    }

    /// Sets the technique limit.
    #[must_use]
    pub fn with_max_techniques(mut self, max_techniques: usize) -> Self {
        self.max_techniques = max_techniques;
        self
    }

    /// Seeds candidates with a pipeline's techniques.
    #[must_use]
    pub fn with_pipeline_techniques(mut self, techniques: &'a [String]) -> Self {
        self.pipeline_techniques = techniques;
        self
    }
}

/// Scores techniques from a [`Compendium`] and picks a budgeted plan.
#[derive(Clone, Debug)]
pub struct TechniqueMatcher {
    compendium: Arc<Compendium>,
    options: MatcherOptions,
}

#[derive(Clone, Copy, Debug, Default)]
struct Sources {
    command: bool,
    alias: bool,
    pipeline: bool,
}

#[derive(Debug)]
struct Candidate<'c> {
    technique: &'c TechniqueCore,
    sources: Sources,
    semantic: f64,
    category_match: bool,
    tag_hits: usize,
    constraint_hit: bool,
}

impl Candidate<'_> {
    fn explicit(&self) -> bool {
        self.sources.command || self.sources.alias
    }
}

struct QueryTerms {
    tokens: HashSet<String>,
    content_stems: Vec<String>,
    constraint_stems: Vec<String>,
}

impl QueryTerms {
    fn new(analysis: &QueryAnalysis) -> Self {
        let mut content_stems: Vec<String> = Vec::new();
        for term in content_terms(&analysis.cleaned_query) {
            let stemmed = stem(&term).to_owned();
            if !content_stems.contains(&stemmed) {
                content_stems.push(stemmed);
            }
        }
        Self {
            tokens: tokenize(&analysis.cleaned_query).into_iter().collect(),
            content_stems,
            constraint_stems: analysis
                .constraints
                .iter()
                .map(|constraint| stem(constraint).to_owned())
                .collect(),
        }
    }
}

impl TechniqueMatcher {
    /// Creates a matcher with default options.
    #[must_use]
    pub fn new(compendium: Arc<Compendium>) -> Self {
        Self {
            compendium,
            options: MatcherOptions::default(),
        }
    }

    /// Replaces the selection thresholds.
    #[must_use]
    pub fn with_options(mut self, options: MatcherOptions) -> Self {
        self.options = options;
        self
    }

    /// Catalog the matcher selects from.
    #[must_use]
    pub fn compendium(&self) -> &Arc<Compendium> {
        &self.compendium
    }

    /// Selects techniques for already-parsed input using lexical similarity only.
    #[must_use]
    pub fn select(&self, text: &str, commands: &[Command], surface: &str, tier: Tier) -> SelectionPlan {
        let analysis = lexical_analysis(text, commands.to_vec(), text, 1);
        let request = SelectionRequest::new(&analysis, surface, tier)
            .with_max_techniques(self.options.default_max_techniques);
        self.select_for(&request)
    }

    /// Runs candidate collection, scoring, and the greedy budgeted walk.
    #[must_use]
    pub fn select_for(&self, request: &SelectionRequest<'_>) -> SelectionPlan {
        let budget = self.compendium.budget(request.tier);
        let mut plan = SelectionPlan::empty(budget);
        let terms = QueryTerms::new(request.analysis);

        let candidates = self.collect_candidates(request, &terms, &mut plan);

        let mut ranked: Vec<(Candidate<'_>, TechniqueScore)> = candidates
            .into_iter()
            .map(|candidate| {
                let score = self.score(&candidate, request, &[]);
                (candidate, score)
            })
            .collect();
        ranked.sort_by(|(a, a_score), (b, b_score)| {
            b_score
                .final_score
                .total_cmp(&a_score.final_score)
                .then_with(|| b.technique.usage_frequency.cmp(&a.technique.usage_frequency))
                .then_with(|| a.technique.id.cmp(&b.technique.id))
        });

        let mut chosen: Vec<&TechniqueCore> = Vec::new();
        for (candidate, base_score) in ranked {
            let technique = candidate.technique;

            if technique
                .conflicts_with
                .iter()
                .any(|other| chosen.iter().any(|picked| picked.id == *other))
            {
                debug!(technique = %technique.id, "dropped: conflicts with chosen technique");
                plan.skipped.push(skipped(&technique.id, SkipReason::Conflict));
                plan.scores.push(base_score);
                continue;
            }

            let score = self.score(&candidate, request, &chosen);
            let explicit = candidate.explicit();
            let outcome = if !explicit && chosen.len() >= request.max_techniques {
                Some(SkipReason::UsageCap)
            } else if !explicit && score.final_score < self.options.min_selection_score {
                Some(SkipReason::BelowThreshold)
            } else if plan.budget_used + technique.estimated_tokens > budget + BUDGET_EPSILON {
                Some(SkipReason::OverBudget)
            } else {
                None
            };

            debug!(
                technique = %technique.id,
                semantic = score.semantic_score,
                boost = score.signal_boost,
                penalty = score.penalty_score,
                final_score = score.final_score,
                skipped = ?outcome,
                "scored candidate"
            );

            match outcome {
                Some(reason) => plan.skipped.push(skipped(&technique.id, reason)),
                None => {
                    plan.budget_used += technique.estimated_tokens;
                    plan.chosen.push(TechniqueSummary {
                        id: technique.id.clone(),
                        name: technique.name.clone(),
                        category: technique.category,
                        phase: technique.phase(),
                        estimated_tokens: technique.estimated_tokens,
                        final_score: score.final_score,
                        template: technique.template.clone(),
                        explicit,
                    });
                    chosen.push(technique);
                }
            }
            plan.scores.push(score);
        }

        info!(
            tier = %request.tier,
            surface = request.surface,
            chosen = plan.chosen.len(),
            candidates = plan.scores.len(),
            budget_used = plan.budget_used,
            budget_limit = plan.budget_limit,
            "selected techniques"
        );
        plan
    }

    fn collect_candidates<'c>(
        &'c self,
        request: &SelectionRequest<'_>,
        terms: &QueryTerms,
        plan: &mut SelectionPlan,
    ) -> Vec<Candidate<'c>> {
        let compendium = self.compendium.as_ref();
        let mut sources: BTreeMap<&'c str, Sources> = BTreeMap::new();

        for command in &request.analysis.pfcl_commands {
            let targets = compendium.directive_targets(command.name());
            let aliased = compendium.by_alias(command.name());
            if targets.is_empty() && aliased.is_empty() {
                if !plan.unknown_directives.iter().any(|d| d == command.name()) {
                    warn!(directive = command.name(), "directive matches no technique");
                    plan.unknown_directives.push(command.name().to_owned());
                }
                continue;
            }
            for id in targets {
                if let Some(technique) = compendium.get(id.as_str()) {
                    sources.entry(technique.id.as_str()).or_default().command = true;
                }
            }
            for technique in aliased {
                sources.entry(technique.id.as_str()).or_default().alias = true;
            }
        }

        for id in request.pipeline_techniques {
            match compendium.get(id) {
                Some(technique) => sources.entry(technique.id.as_str()).or_default().pipeline = true,
                None => {
                    warn!(technique = %id, "pipeline references unknown technique");
                    plan.skipped.push(SkippedTechnique {
                        id: id.clone(),
                        reason: SkipReason::Unknown,
                    });
                }
            }
        }

        let preferred = request.analysis.intent_type.preferred_categories();
        let mut candidates = Vec::new();
        for technique in compendium.techniques() {
            let semantic = self.semantic_score(technique, request.analysis, terms);
            let category_match = preferred.contains(&technique.category);
            let tag_hits = technique
                .tags
                .iter()
                .filter(|tag| terms.tokens.contains(tag.as_str()))
                .count();
            let seeded = sources.remove(technique.id.as_str());

            let implicit = technique.available_on(request.surface)
                && (tag_hits > 0
                    || category_match
                    || semantic >= self.options.semantic_candidate_threshold);
            if seeded.is_none() && !implicit {
                continue;
            }

            candidates.push(Candidate {
                technique,
                sources: seeded.unwrap_or_default(),
                semantic,
                category_match,
                tag_hits,
                constraint_hit: violates_constraint(technique, terms),
            });
        }
        candidates
    }

    fn semantic_score(
        &self,
        technique: &TechniqueCore,
        analysis: &QueryAnalysis,
        terms: &QueryTerms,
    ) -> f64 {
        if let Some(description) = &technique.description_embedding {
            if analysis.is_embedded()
                && !description.is_zero()
                && description.len() == analysis.query_embedding.len()
            {
                return f64::from(cosine_similarity(&analysis.query_embedding, description))
                    .clamp(0.0, 1.0);
            }
        }
        lexical_overlap(technique, &terms.content_stems)
    }

    fn signals(&self, candidate: &Candidate<'_>, chosen: &[&TechniqueCore]) -> Vec<(Signal, f64)> {
        let weight = |signal| self.compendium.signal_weight(signal);
        let technique = candidate.technique;
        let mut signals = Vec::new();

        if candidate.sources.command {
            signals.push((Signal::PfclCommand, weight(Signal::PfclCommand)));
        }
        if candidate.sources.alias {
            signals.push((Signal::PfclAlias, weight(Signal::PfclAlias)));
        }
        if candidate.sources.pipeline {
            signals.push((Signal::PipelineDefault, weight(Signal::PipelineDefault)));
        }
        if candidate.category_match {
            signals.push((Signal::CategoryMatch, weight(Signal::CategoryMatch)));
        }
        if candidate.tag_hits > 0 {
            #[allow(clippy::cast_precision_loss)]
            let hits = candidate.tag_hits.min(MAX_TAG_SIGNALS) as f64;
            signals.push((Signal::TagOverlap, weight(Signal::TagOverlap) * hits));
        }
        if technique.success_rate > 0.0 {
            signals.push((
                Signal::SuccessRate,
                weight(Signal::SuccessRate) * technique.success_rate,
            ));
        }
        if chosen.iter().any(|picked| {
            picked.complementary_techniques.contains(&technique.id)
                || technique.complementary_techniques.contains(&picked.id)
        }) {
            signals.push((Signal::Complementary, weight(Signal::Complementary)));
        }
        signals
    }

    fn penalty(&self, candidate: &Candidate<'_>, chosen: &[&TechniqueCore], max: usize) -> f64 {
        let weight = |penalty| self.compendium.penalty_weight(penalty);
        let mut total = 0.0;
        if chosen
            .iter()
            .any(|picked| picked.conflicts_with.contains(&candidate.technique.id))
        {
            total += weight(Penalty::Conflict);
        }
        if chosen.len() >= max {
            total += weight(Penalty::UsageCap);
        }
        if candidate.constraint_hit {
            total += weight(Penalty::Constraint);
        }
        total
    }

    fn score(
        &self,
        candidate: &Candidate<'_>,
        request: &SelectionRequest<'_>,
        chosen: &[&TechniqueCore],
    ) -> TechniqueScore {
        let signals = self.signals(candidate, chosen);
        let boost: f64 = signals.iter().map(|(_, value)| value).sum();
        let penalty = self.penalty(candidate, chosen, request.max_techniques);
        let technique = candidate.technique;

        TechniqueScore::new(
            technique.id.clone(),
            technique.name.clone(),
            candidate.semantic,
            boost,
            penalty,
        )
        .with_reason(dominant_reason(
            technique,
            request.analysis,
            candidate.semantic,
            &signals,
        ))
    }
}

fn skipped(id: &TechniqueId, reason: SkipReason) -> SkippedTechnique {
    SkippedTechnique {
        id: id.to_string(),
        reason,
    }
}

fn technique_stems(technique: &TechniqueCore) -> HashSet<String> {
    tokenize(&technique.search_text())
        .iter()
        .flat_map(|token| token.split('_'))
        .filter(|part| !part.is_empty())
        .map(|part| stem(part).to_owned())
        .collect()
}

/// Fraction of the query's content stems found in the technique's text.
#[allow(clippy::cast_precision_loss)]
fn lexical_overlap(technique: &TechniqueCore, query_stems: &[String]) -> f64 {
    if query_stems.is_empty() {
        return 0.0;
    }
    let known = technique_stems(technique);
    let matched = query_stems.iter().filter(|s| known.contains(*s)).count();
    matched as f64 / query_stems.len() as f64
}

fn violates_constraint(technique: &TechniqueCore, terms: &QueryTerms) -> bool {
    if terms.constraint_stems.is_empty() {
        return false;
    }
    let mut own: HashSet<String> = technique
        .tags
        .iter()
        .map(|tag| stem(tag).to_owned())
        .collect();
    own.extend(
        technique
            .id
            .as_str()
            .split('_')
            .map(|part| stem(part).to_owned()),
    );
    terms.constraint_stems.iter().any(|c| own.contains(c))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use demon_config::ScoringWeights;
    use demon_embeddings::{EmbeddingProvider, HashingEmbedder};
    use demon_primitives::Category;
    use demon_prompts::parse;

    use super::*;
    use crate::analyzer::QueryAnalyzer;

    const STUB: &str = r#"{
        "defaults": {"budget_tokens": {"free": 1.0}},
        "pfcl": {"commands": {"/structure": {"maps_to": ["json_schema_guided"]}}},
        "scoring": {"signals": {"pfcl_alias": 2.0}},
        "techniques": [
            {"id": "json_schema_guided", "aliases": ["/structure"], "phase": ["post"], "cost_estimate": {"tokens": 0.5}}
        ]
    }"#;

    fn technique(id: &str, tokens: f64, usage: u64) -> TechniqueCore {
        let mut technique = TechniqueCore::new(TechniqueId::new(id).unwrap());
        technique.estimated_tokens = tokens;
        technique.usage_frequency = usage;
        technique.category = Category::Reasoning;
        technique
    }

    fn id(raw: &str) -> TechniqueId {
        TechniqueId::new(raw).unwrap()
    }

    fn builtin() -> TechniqueMatcher {
        TechniqueMatcher::new(Arc::new(Compendium::builtin().unwrap()))
    }

    fn assert_plan_invariants(plan: &SelectionPlan) {
        let spent: f64 = plan.chosen.iter().map(|t| t.estimated_tokens).sum();
        assert!(spent <= plan.budget_limit + BUDGET_EPSILON);
        assert!((spent - plan.budget_used).abs() < 1e-9);
        for score in &plan.scores {
            assert!((0.0..=0.5).contains(&score.signal_boost), "{score:?}");
            assert!((0.0..=0.5).contains(&score.penalty_score), "{score:?}");
            assert!((0.0..=1.0).contains(&score.final_score), "{score:?}");
        }
    }

    #[test]
    fn selects_structure_within_budget() {
        let compendium = Compendium::from_json_str(STUB).unwrap();
        let matcher = TechniqueMatcher::new(Arc::new(compendium));
        let (commands, remainder) = parse("/structure make it json please");

        let plan = matcher.select(&remainder, &commands, "web", Tier::Free);

        assert!(plan.chosen_ids().any(|id| id == "json_schema_guided"));
        assert!((plan.budget_used - 0.5).abs() < f64::EPSILON);
        assert!((plan.budget_limit - 1.0).abs() < f64::EPSILON);
        let score = plan.score_of("json_schema_guided").unwrap();
        assert!((score.signal_boost - 0.5).abs() < f64::EPSILON);
        assert_plan_invariants(&plan);
    }

    #[test]
    fn budget_blocked_candidate_is_skipped_and_scan_continues() {
        let compendium = Compendium::builder()
            .technique(technique("big", 10.0, 100))
            .technique(technique("small", 2.0, 1))
            .command("/go", vec![id("big"), id("small")])
            .budget(Tier::Free, 5.0)
            .build()
            .unwrap();
        let matcher = TechniqueMatcher::new(Arc::new(compendium));
        let (commands, remainder) = parse("/go now");

        let plan = matcher.select(&remainder, &commands, "*", Tier::Free);

        assert_eq!(plan.chosen_ids().collect::<Vec<_>>(), vec!["small"]);
        assert!(plan.skipped.iter().any(|s| s.id == "big" && s.reason == SkipReason::OverBudget));
        assert_plan_invariants(&plan);
    }

    #[test]
    fn candidate_conflicting_with_chosen_is_removed() {
        let mut loser = technique("quick", 1.0, 1);
        loser.conflicts_with.insert(id("deep"));
        let compendium = Compendium::builder()
            .technique(technique("deep", 1.0, 50))
            .technique(loser)
            .command("/both", vec![id("deep"), id("quick")])
            .budget(Tier::Free, 10.0)
            .build()
            .unwrap();
        let matcher = TechniqueMatcher::new(Arc::new(compendium));
        let (commands, remainder) = parse("/both go");

        let plan = matcher.select(&remainder, &commands, "*", Tier::Free);

        assert_eq!(plan.chosen_ids().collect::<Vec<_>>(), vec!["deep"]);
        assert!(plan.skipped.iter().any(|s| s.id == "quick" && s.reason == SkipReason::Conflict));
    }

    #[test]
    fn chosen_conflict_list_penalizes_later_candidates() {
        let mut first = technique("deep", 1.0, 50);
        first.conflicts_with.insert(id("quick"));
        let compendium = Compendium::builder()
            .technique(first)
            .technique(technique("quick", 1.0, 1))
            .command("/both", vec![id("deep"), id("quick")])
            .budget(Tier::Free, 10.0)
            .weights(ScoringWeights::default().with_penalty(Penalty::Conflict, 0.25))
            .build()
            .unwrap();
        let matcher = TechniqueMatcher::new(Arc::new(compendium));
        let (commands, remainder) = parse("/both go");

        let plan = matcher.select(&remainder, &commands, "*", Tier::Free);

        let score = plan.score_of("quick").unwrap();
        assert!((score.penalty_score - 0.25).abs() < f64::EPSILON);
        assert_eq!(plan.chosen.len(), 2, "explicit requests ignore the score floor");
    }

    #[test]
    fn complementary_bonus_applies_after_partner_is_chosen() {
        let mut lead = technique("lead", 1.0, 50);
        lead.complementary_techniques.insert(id("partner"));
        let compendium = Compendium::builder()
            .technique(lead)
            .technique(technique("partner", 1.0, 1))
            .command("/duo", vec![id("lead"), id("partner")])
            .budget(Tier::Free, 10.0)
            .build()
            .unwrap();
        let matcher = TechniqueMatcher::new(Arc::new(compendium));
        let (commands, remainder) = parse("/duo go");

        let plan = matcher.select(&remainder, &commands, "*", Tier::Free);

        let lead = plan.score_of("lead").unwrap();
        let partner = plan.score_of("partner").unwrap();
        assert!((partner.signal_boost - lead.signal_boost - 0.10).abs() < 1e-9);
    }

    #[test]
    fn unknown_directives_are_reported_once() {
        let (commands, remainder) = parse("/nonsense /nonsense hello there");
        let plan = builtin().select(&remainder, &commands, "*", Tier::Free);
        assert_eq!(plan.unknown_directives, vec!["/nonsense"]);
    }

    #[test]
    fn surface_filter_applies_to_implicit_candidates_only() {
        let matcher = builtin();
        let (commands, remainder) = parse("write a marketing teaser hook for our landing page");

        let web = matcher.select(&remainder, &commands, "web", Tier::Free);
        assert!(web.score_of("teaser").is_some());

        let vscode = matcher.select(&remainder, &commands, "vscode", Tier::Free);
        assert!(vscode.score_of("teaser").is_none());

        let (commands, remainder) = parse("/teaser landing page copy");
        let explicit = matcher.select(&remainder, &commands, "vscode", Tier::Free);
        assert!(explicit.chosen_ids().any(|id| id == "teaser"));
    }

    #[test]
    fn pipeline_techniques_seed_candidates() {
        let matcher = builtin();
        let analysis = lexical_analysis("hi", Vec::new(), "hi", 1);
        let pipeline = vec!["persona_alignment".to_owned(), "ghost_technique".to_owned()];
        let request = SelectionRequest::new(&analysis, "chrome", Tier::Free)
            .with_pipeline_techniques(&pipeline);

        let plan = matcher.select_for(&request);

        assert!(plan.chosen_ids().any(|id| id == "persona_alignment"));
        assert!(
            plan.skipped
                .iter()
                .any(|s| s.id == "ghost_technique" && s.reason == SkipReason::Unknown)
        );
        let score = plan.score_of("persona_alignment").unwrap();
        assert!(score.selection_reason.contains("pipeline") || score.selection_reason.contains("semantic"));
    }

    #[test]
    fn usage_cap_limits_implicit_choices() {
        let matcher = builtin();
        let analysis = lexical_analysis(
            "explain step by step how to debug and review this function",
            Vec::new(),
            "explain step by step how to debug and review this function",
            1,
        );
        let request = SelectionRequest::new(&analysis, "*", Tier::Pro).with_max_techniques(1);

        let plan = matcher.select_for(&request);

        assert_eq!(plan.chosen.len(), 1);
        assert!(plan.skipped.iter().any(|s| s.reason == SkipReason::UsageCap));
        assert_plan_invariants(&plan);
    }

    #[test]
    fn constraints_penalize_matching_techniques() {
        let matcher = builtin();
        let (commands, remainder) = parse("/structure format=json avoid=json give me the data");
        let plan = matcher.select(&remainder, &commands, "*", Tier::Free);
        let score = plan.score_of("json_schema_guided").unwrap();
        assert!(score.penalty_score >= 0.3 - 1e-9);
    }

    #[test]
    fn empty_compendium_yields_empty_plan() {
        let matcher = TechniqueMatcher::new(Arc::new(Compendium::builder().build().unwrap()));
        let (commands, remainder) = parse("/structure anything");
        let plan = matcher.select(&remainder, &commands, "*", Tier::Pro);
        assert!(plan.chosen.is_empty());
        assert!(plan.budget_limit.abs() < f64::EPSILON);
        assert_eq!(plan.unknown_directives, vec!["/structure"]);
    }

    #[test]
    fn ranking_is_deterministic() {
        let matcher = builtin();
        let (commands, remainder) = parse("/cot compare these two sorting algorithms");
        let first = matcher.select(&remainder, &commands, "*", Tier::Pro);
        let second = matcher.select(&remainder, &commands, "*", Tier::Pro);
        assert_eq!(first, second);
        assert!(first.chosen_ids().any(|id| id == "chain_of_thought"));
        assert_plan_invariants(&first);
    }

    #[tokio::test]
    async fn embedded_selection_respects_invariants() {
        let embedder = Arc::new(HashingEmbedder::new(384).unwrap());
        let base = Compendium::builtin().unwrap();
        let embeddings: Vec<_> = base
            .techniques()
            .iter()
            .map(|t| (t.id.clone(), embedder.embed_now(&t.search_text())))
            .collect();
        let compendium = base.with_description_embeddings(embeddings);
        let analyzer = QueryAnalyzer::new(embedder.clone(), Duration::from_millis(250));
        assert_eq!(analyzer.provider().dimensions(), 384);
        let matcher = TechniqueMatcher::new(Arc::new(compendium));

        for query in [
            "/cot think about this math problem",
            "Explain how photosynthesis works",
            "Write a function to add two numbers.",
            "Create a business plan for an AI startup",
        ] {
            let analysis = analyzer.analyze(query).await;
            let plan = matcher.select_for(&SelectionRequest::new(&analysis, "*", Tier::Free));
            assert_plan_invariants(&plan);
            assert!(plan.chosen.len() <= 5 + analysis.pfcl_commands.len());
        }
    }
}
