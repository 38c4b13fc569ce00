use demon_primitives::Tier;
use demon_router::{RouteDecision, Router};

fn route(intent: &str, tier: Tier, client: &str, pro: bool) -> RouteDecision {
    Router::builtin()
        .unwrap()
        .route(Some(intent), Some(tier), Some(client), pro)
        .unwrap()
}

#[test]
fn chrome_chat_contract() {
    let decision = route("chat", Tier::Free, "chrome", false);
    assert_eq!(decision.output_contract, "paragraphs_and_bullets");
    assert!(decision.techniques.iter().any(|t| t == "persona_alignment"));

    let decision = route("chat", Tier::Pro, "chrome", true);
    assert_eq!(decision.output_contract, "paragraphs_and_bullets");
    assert!(decision.techniques.iter().any(|t| t == "clarify_then_answer"));
}

#[test]
fn vscode_editor_contract() {
    let decision = route("editor", Tier::Free, "vscode", false);
    assert_eq!(decision.output_contract, "imperative_lines");
    assert!(decision.techniques.iter().any(|t| t == "acceptance_criteria"));

    let decision = route("editor", Tier::Pro, "vscode", true);
    assert_eq!(decision.output_contract, "imperative_lines");
    assert!(decision.techniques.iter().any(|t| t == "multi_pass_refinement"));
}

#[test]
fn cursor_agent_contract() {
    let decision = route("agent", Tier::Pro, "cursor", true);
    assert_eq!(decision.output_contract, "agent_plan");
    assert!(decision.techniques.iter().any(|t| t == "objective_expansion"));
    assert!(decision.safety.iter().any(|s| s == "guard_infinite_loops"));

    let decision = route("agent", Tier::Free, "cursor", false);
    assert_eq!(decision.output_contract, "pro_only");
}

#[test]
fn web_temple_contract() {
    let mentions = |decision: &RouteDecision, id: &str| {
        decision.techniques.iter().chain(&decision.templates).any(|t| t == id)
    };

    let decision = route("chat", Tier::Free, "web", false);
    assert_eq!(decision.output_contract, "marketing_friendly");
    assert!(mentions(&decision, "teaser"));

    let decision = route("chat", Tier::Pro, "web", true);
    assert_eq!(decision.output_contract, "marketing_friendly");
    assert!(mentions(&decision, "structured_outline"));
}
