//! Output validation and fidelity scoring.
//!
//! Nothing here fails: every check returns a usable verdict so callers can decide
//! whether to retry or re-prompt.

use std::collections::HashSet;

use demon_primitives::text::{content_terms, stem, tokenize};
use serde::Serialize;
use serde_json::Value;

use crate::analysis::QueryAnalysis;

const RECALL_WEIGHT: f64 = 0.8;
const LENGTH_WEIGHT: f64 = 0.2;

/// Combined verdict for one model output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputEvaluation {
    /// True when neither the format nor the contract check failed.
    pub valid: bool,
    /// Human-readable problems, empty when valid.
    pub errors: Vec<String>,
    /// Lexical fidelity in `[0, 1]`.
    pub fidelity_score: f64,
}

/// Runs [`validate_output`], [`validate_contract`] when a contract is known, and
/// [`calculate_fidelity_score`].
#[must_use]
pub fn evaluate(output: &str, analysis: &QueryAnalysis, contract: Option<&str>) -> OutputEvaluation {
    let (format_ok, mut errors) = validate_output(output, analysis);
    let contract_ok = match contract {
        Some(contract) => {
            let (ok, contract_errors) = validate_contract(output, contract);
            for error in contract_errors {
                if !errors.contains(&error) {
                    errors.push(error);
                }
            }
            ok
        }
        None => true,
    };
    OutputEvaluation {
        valid: format_ok && contract_ok,
        errors,
        fidelity_score: calculate_fidelity_score(output, analysis),
    }
}

/// Checks `output` against the format the user asked for.
///
/// `json` requires a strict parse of the whole output, which may be wrapped in a
/// single Markdown code fence (the fence is stripped, nothing else is tolerated).
/// `markdown` requires a heading or list and `bullets` a list. Other formats only
/// require non-empty output.
#[must_use]
pub fn validate_output(output: &str, analysis: &QueryAnalysis) -> (bool, Vec<String>) {
    if output.trim().is_empty() {
        return (false, vec!["output is empty".to_owned()]);
    }

    let mut errors = Vec::new();
    match analysis.output_format_requested.as_deref() {
        Some("json") => {
            if let Err(err) = serde_json::from_str::<Value>(strip_code_fence(output)) {
                errors.push(format!("output is not valid JSON: {err}"));
            }
        }
        Some("markdown") => {
            if !output.lines().any(|line| is_heading(line) || is_list_item(line)) {
                errors.push("markdown output has no headings or list items".to_owned());
            }
        }
        Some("bullets") => {
            if !output.lines().any(is_list_item) {
                errors.push("bulleted output has no list items".to_owned());
            }
        }
        Some("table") => {
            if output.lines().filter(|line| line.contains('|')).count() < 2 {
                errors.push("table output needs a header and at least one row".to_owned());
            }
        }
        _ => {}
    }
    (errors.is_empty(), errors)
}

/// Checks `output` against a pipeline's output contract.
///
/// Unrecognized contracts accept any non-empty output.
#[must_use]
pub fn validate_contract(output: &str, contract: &str) -> (bool, Vec<String>) {
    if contract == "pro_only" {
        return (false, vec!["pipeline requires a pro subscription".to_owned()]);
    }
    if output.trim().is_empty() {
        return (false, vec!["output is empty".to_owned()]);
    }

    let mut errors = Vec::new();
    match contract {
        "agent_plan" => {
            let has_steps = output.lines().any(is_list_item)
                || try_parse_json(output)
                    .and_then(|value| value.get("steps").and_then(Value::as_array).map(Vec::len))
                    .is_some_and(|steps| steps > 0);
            if !has_steps {
                errors.push("agent plan lists no steps".to_owned());
            }
        }
        "imperative_lines" => {
            for (idx, line) in output.lines().enumerate() {
                if line.trim_end().ends_with('?') {
                    errors.push(format!("line {} is a question, expected an instruction", idx + 1));
                }
            }
        }
        _ => {}
    }
    (errors.is_empty(), errors)
}

/// Lexical estimate of how well `output` covers the query.
///
/// Weighted sum of the recall of the query's content terms (compared by stem) and
/// a length adequacy term that saturates once the output is as long as the query.
#[must_use]
pub fn calculate_fidelity_score(output: &str, analysis: &QueryAnalysis) -> f64 {
    let output_tokens = tokenize(output);
    if output_tokens.is_empty() {
        return 0.0;
    }

    let output_stems: HashSet<&str> = output_tokens.iter().map(|token| stem(token)).collect();
    let query_terms = content_terms(&analysis.cleaned_query);
    let query_stems: HashSet<&str> = query_terms.iter().map(|term| stem(term)).collect();

    #[allow(clippy::cast_precision_loss)]
    let recall = if query_stems.is_empty() {
        1.0
    } else {
        let matched = query_stems.iter().filter(|s| output_stems.contains(*s)).count();
        matched as f64 / query_stems.len() as f64
    };

    let query_len = tokenize(&analysis.cleaned_query).len().max(1);
    #[allow(clippy::cast_precision_loss)]
    let adequacy = (output_tokens.len() as f64 / query_len as f64).min(1.0);

    (RECALL_WEIGHT * recall + LENGTH_WEIGHT * adequacy).clamp(0.0, 1.0)
}

/// Parses `text` as JSON, tolerating a surrounding Markdown code fence.
#[must_use]
pub fn try_parse_json(text: &str) -> Option<Value> {
    serde_json::from_str(strip_code_fence(text)).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    match inner.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => inner.trim(),
    }
}

fn is_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&level) && trimmed[level..].starts_with(' ')
}

fn is_list_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    if ["- ", "* ", "+ ", "• "].iter().any(|marker| trimmed.starts_with(marker)) {
        return true;
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && {
        let rest = &trimmed[digits..];
        rest.starts_with(". ") || rest.starts_with(") ")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::analyzer::lexical_analysis;

    fn analysis(query: &str, format: Option<&str>) -> QueryAnalysis {
        let mut analysis = lexical_analysis(query, Vec::new(), query, 8);
        analysis.output_format_requested = format.map(str::to_owned);
        analysis
    }

    #[test]
    fn json_format_requires_strict_parse() {
        let analysis = analysis("return the result as data", Some("json"));
        assert_eq!(
            validate_output(r#"{"result":"success","data":[1,2,3]}"#, &analysis),
            (true, Vec::new())
        );

        let (ok, errors) = validate_output(r#"{"result":"success","data":[1,2,3"#, &analysis);
        assert!(!ok);
        assert!(!errors.is_empty());
        assert!(errors[0].contains("not valid JSON"));
    }

    #[test]
    fn json_format_accepts_a_fenced_block_only() {
        let analysis = analysis("return the result as data", Some("json"));
        assert!(validate_output("```json\n{\"result\": 1}\n```", &analysis).0);
        assert!(!validate_output("```json\n{\"result\": 1\n```", &analysis).0);
        assert!(!validate_output("Here you go: {\"result\": 1}", &analysis).0);
    }

    #[test]
    fn parses_json_or_returns_none() {
        assert_eq!(
            try_parse_json(r#"{"key":"value","number":42}"#),
            Some(json!({"key": "value", "number": 42}))
        );
        assert_eq!(try_parse_json("not json at all"), None);
        assert_eq!(try_parse_json("```json\n{\"a\": 1}\n```"), Some(json!({"a": 1})));
        assert_eq!(try_parse_json(""), None);
    }

    #[test]
    fn empty_output_is_invalid() {
        let (ok, errors) = validate_output("   \n", &analysis("anything", None));
        assert!(!ok);
        assert_eq!(errors, vec!["output is empty"]);
    }

    #[test]
    fn markdown_and_bullets_need_structure() {
        let markdown = analysis("outline the plan", Some("markdown"));
        assert!(validate_output("# Plan\nSome text", &markdown).0);
        assert!(validate_output("1. first\n2. second", &markdown).0);
        assert!(!validate_output("just a paragraph", &markdown).0);
        assert!(!validate_output("#hashtag only", &markdown).0);

        let bullets = analysis("list the steps", Some("bullets"));
        assert!(validate_output("- one\n- two", &bullets).0);
        assert!(!validate_output("# Heading", &bullets).0);
    }

    #[test]
    fn contracts_are_checked() {
        assert!(validate_contract("1. gather\n2. build", "agent_plan").0);
        assert!(validate_contract(r#"{"steps": ["gather"]}"#, "agent_plan").0);
        assert!(!validate_contract(r#"{"steps": []}"#, "agent_plan").0);
        assert!(!validate_contract("I would gather things", "agent_plan").0);

        assert!(validate_contract("Add the function.\nRun the tests.", "imperative_lines").0);
        let (ok, errors) = validate_contract("Add it.\nShould I test?", "imperative_lines");
        assert!(!ok);
        assert!(errors[0].starts_with("line 2"));

        assert!(!validate_contract("anything", "pro_only").0);
        assert!(validate_contract("Hello there", "paragraphs_and_bullets").0);
        assert!(!validate_contract("", "marketing_friendly").0);
    }

    #[test]
    fn fidelity_prefers_on_topic_output() {
        let analysis = analysis("Explain how photosynthesis converts sunlight", None);
        let on_topic = calculate_fidelity_score(
            "Photosynthesis converts sunlight into chemical energy stored in glucose.",
            &analysis,
        );
        let off_topic = calculate_fidelity_score("Stock markets closed higher today.", &analysis);

        assert!(on_topic > off_topic);
        assert!((0.0..=1.0).contains(&on_topic));
        assert!((0.0..=1.0).contains(&off_topic));
        assert!(calculate_fidelity_score("", &analysis).abs() < f64::EPSILON);
    }

    #[test]
    fn fidelity_is_deterministic() {
        let analysis = analysis("summarize the meeting notes", None);
        let output = "The meeting notes cover budget and hiring.";
        assert!(
            (calculate_fidelity_score(output, &analysis) - calculate_fidelity_score(output, &analysis))
                .abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn evaluation_merges_checks() {
        let analysis = analysis("write the build steps", Some("json"));
        let evaluation = evaluate("Run build?", &analysis, Some("imperative_lines"));
        assert!(!evaluation.valid);
        assert_eq!(evaluation.errors.len(), 2);
        assert!(evaluation.fidelity_score > 0.0);

        let evaluation = evaluate(r#"{"build": "steps"}"#, &analysis, None);
        assert!(evaluation.valid);
    }
}
