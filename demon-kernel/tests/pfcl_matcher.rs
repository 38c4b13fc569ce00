use std::io::Write;
use std::sync::Arc;

use demon_brain::TechniqueMatcher;
use demon_config::Compendium;
use demon_primitives::Tier;
use demon_prompts::DirectiveParser;

#[test]
fn parses_leading_directives() {
    let parsed = DirectiveParser::new().parse("/clean /structure n=2 hello world");
    let names: Vec<_> = parsed.commands().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["/clean", "/structure"]);
    assert_eq!(parsed.commands()[1].arg("n"), Some("2"));
    assert_eq!(parsed.remainder(), "hello world");

    let parsed = DirectiveParser::new().parse("hello world");
    assert!(parsed.commands().is_empty());
    assert_eq!(parsed.remainder(), "hello world");
}

#[test]
fn matcher_selects_structure_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "defaults": {{"budget_tokens": {{"free": 1.0}}}},
            "pfcl": {{"commands": {{"/structure": {{"maps_to": ["json_schema_guided"]}}}}}},
            "scoring": {{"signals": {{"pfcl_alias": 2.0}}}},
            "techniques": [
                {{"id": "json_schema_guided", "aliases": ["/structure"], "phase": ["post"], "cost_estimate": {{"tokens": 0.5}}}}
            ]
        }}"#
    )
    .unwrap();

    let compendium = Compendium::from_path(file.path()).unwrap();
    let matcher = TechniqueMatcher::new(Arc::new(compendium));
    let (commands, remainder) = DirectiveParser::new()
        .parse("/structure make it json please")
        .into_parts();

    let plan = matcher.select(&remainder, &commands, "web", Tier::Free);

    assert!(plan.chosen_ids().any(|id| id == "json_schema_guided"));
    assert!(plan.budget_used <= plan.budget_limit);
}

#[test]
fn builtin_directive_targets_exist() {
    let compendium = Compendium::builtin().unwrap();
    for directive in compendium.directives() {
        for id in compendium.directive_targets(directive) {
            assert!(compendium.get(id.as_str()).is_some(), "{directive} -> {id}");
        }
    }
}
