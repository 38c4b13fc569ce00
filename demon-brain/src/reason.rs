//! Human-readable selection reasons.

use demon_config::{Signal, TechniqueCore};

use crate::analysis::QueryAnalysis;

/// Justification built around the semantic similarity of a technique.
///
/// ```
/// use demon_brain::{analyzer::lexical_analysis, generate_selection_reason};
/// use demon_config::TechniqueCore;
/// use demon_primitives::TechniqueId;
///
/// let technique = TechniqueCore::new(TechniqueId::new("chain_of_thought").unwrap());
/// let analysis = lexical_analysis("Explain photosynthesis", Vec::new(), "Explain photosynthesis", 8);
/// let reason = generate_selection_reason(&technique, &analysis, 0.8);
/// assert!(reason.starts_with("high semantic similarity (0.80)"));
/// ```
#[must_use]
pub fn generate_selection_reason(
    technique: &TechniqueCore,
    analysis: &QueryAnalysis,
    semantic_score: f64,
) -> String {
    let strength = if semantic_score >= 0.7 {
        "high"
    } else if semantic_score >= 0.35 {
        "moderate"
    } else {
        "low"
    };
    let mut reason = format!("{strength} semantic similarity ({semantic_score:.2})");
    if analysis
        .intent_type
        .preferred_categories()
        .contains(&technique.category)
    {
        reason.push_str(&format!(
            "; {} suits {} requests",
            technique.category, analysis.intent_type
        ));
    }
    reason
}

/// Justification naming whichever contribution dominated the score.
pub(crate) fn dominant_reason(
    technique: &TechniqueCore,
    analysis: &QueryAnalysis,
    semantic_score: f64,
    signals: &[(Signal, f64)],
) -> String {
    let strongest = signals
        .iter()
        .filter(|(_, weight)| *weight > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match strongest {
        Some((signal, weight)) if *weight > semantic_score => format!(
            "{} (+{weight:.2}); semantic similarity {semantic_score:.2}",
            describe_signal(*signal, technique, analysis)
        ),
        _ => generate_selection_reason(technique, analysis, semantic_score),
    }
}

fn describe_signal(signal: Signal, technique: &TechniqueCore, analysis: &QueryAnalysis) -> String {
    match signal {
        Signal::PfclCommand => "requested by directive".to_owned(),
        Signal::PfclAlias => "directive matches an alias".to_owned(),
        Signal::PipelineDefault => "default technique of the routed pipeline".to_owned(),
        Signal::CategoryMatch => format!(
            "{} suits {} requests",
            technique.category, analysis.intent_type
        ),
        Signal::TagOverlap => "tags overlap the query".to_owned(),
        Signal::SuccessRate => format!(
            "strong track record ({:.0}% success)",
            technique.success_rate * 100.0
        ),
        Signal::Complementary => "complements an already chosen technique".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use demon_primitives::{Category, TechniqueId};

    use super::*;
    use crate::analyzer::lexical_analysis;

    fn technique() -> TechniqueCore {
        let mut technique = TechniqueCore::new(TechniqueId::new("test_technique_001").unwrap());
        technique.category = Category::Reasoning;
        technique.success_rate = 0.9;
        technique
    }

    fn analysis() -> QueryAnalysis {
        let query = "Explain how photosynthesis works";
        lexical_analysis(query, Vec::new(), query, 8)
    }

    #[test]
    fn mentions_semantic_similarity() {
        let reason = generate_selection_reason(&technique(), &analysis(), 0.8);
        assert!(reason.contains("high semantic similarity"));
        assert!(reason.contains("reasoning suits explanation requests"));
    }

    #[test]
    fn weak_similarity_is_labelled() {
        assert!(generate_selection_reason(&technique(), &analysis(), 0.1).starts_with("low"));
    }

    #[test]
    fn strongest_signal_wins_over_weak_similarity() {
        let reason = dominant_reason(
            &technique(),
            &analysis(),
            0.1,
            &[(Signal::PfclCommand, 0.35), (Signal::SuccessRate, 0.09)],
        );
        assert!(reason.starts_with("requested by directive (+0.35)"));

        let reason = dominant_reason(&technique(), &analysis(), 0.9, &[(Signal::PfclCommand, 0.35)]);
        assert!(reason.starts_with("high semantic similarity"));
    }
}
