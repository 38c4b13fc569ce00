use demon_kernel::{DemonEngine, UpgradeRequest};

fn editor_request(explain: bool) -> UpgradeRequest {
    serde_json::from_value(serde_json::json!({
        "text": "Write a function to add two numbers.",
        "mode": "pro",
        "client": "vscode",
        "intent": "editor",
        "meta": {},
        "explain": explain,
    }))
    .unwrap()
}

#[tokio::test]
async fn explain_response_carries_plan_trace_and_contract() {
    let engine = DemonEngine::offline().await.unwrap();
    let response = engine.upgrade(editor_request(true).with_pro(true)).await.unwrap();

    assert!(!response.plan.chosen.is_empty());
    assert!((0.0..=1.0).contains(&response.fidelity_score));
    assert!(response.message.contains("Output contract"));

    let trace = response.explanation.as_ref().unwrap();
    assert_eq!(trace.request_id, response.request_id);
    assert!(!trace.matched_entries.is_empty());
    assert!(trace.matched_entries[0].contains("CodeForge.LangGraph"));
    for stage in ["analyze", "route", "select", "compose", "fidelity"] {
        assert!(trace.stage(stage).is_some(), "missing stage {stage}");
    }

    let json = serde_json::to_value(&response).unwrap();
    assert!(json["plan"].is_object());
    assert!(json["fidelity_score"].is_number());
    assert!(json["explanation"]["matched_entries"].is_array());
}

#[tokio::test]
async fn trace_is_omitted_unless_requested() {
    let engine = DemonEngine::offline().await.unwrap();
    let response = engine.upgrade(editor_request(false).with_pro(true)).await.unwrap();
    assert!(response.explanation.is_none());
    assert!(response.message.contains("Output contract: imperative_lines"));
}
