//! Response Parser (spec.md §4.D): turns a raw LLM completion into a
//! [`DecisionRecord`] by trying five strategies in order of how much
//! structure they assume — JSON, YAML-shaped, key/value, markdown, plain
//! text — and taking the first one that matches. The last strategy never
//! fails, so `parse` always returns a record.

pub mod fields;
pub mod json_strategy;
pub mod line_scan;
pub mod markdown;
pub mod plain_text;

use orch_core::DecisionRecord;

/// Which strategy ultimately produced a [`DecisionRecord`], surfaced so
/// callers (and logs) can tell how much the model's output degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Json,
    YamlShaped,
    KeyValue,
    Markdown,
    PlainText,
}

impl Strategy {
    fn label(self) -> &'static str {
        match self {
            Strategy::Json => "json",
            Strategy::YamlShaped => "yamlShaped",
            Strategy::KeyValue => "keyValue",
            Strategy::Markdown => "markdown",
            Strategy::PlainText => "plainText",
        }
    }
}

/// The parsed record alongside which strategy produced it.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub record: DecisionRecord,
    pub strategy: Strategy,
}

/// Runs the five-strategy cascade against one raw LLM completion.
///
/// Each attempt is logged at `debug` so a session's logs show exactly how
/// far the cascade had to fall before something matched; the final
/// plain-text strategy cannot fail, so this function always returns.
pub fn parse(raw: &str) -> ParseOutcome {
    if let Some(record) = attempt("json", json_strategy::try_parse(raw)) {
        return ParseOutcome { record, strategy: Strategy::Json };
    }
    if let Some(record) = attempt("yamlShaped", line_scan::try_parse_yaml_shaped(raw)) {
        return ParseOutcome { record, strategy: Strategy::YamlShaped };
    }
    if let Some(record) = attempt("keyValue", line_scan::try_parse_key_value(raw)) {
        return ParseOutcome { record, strategy: Strategy::KeyValue };
    }
    if let Some(record) = attempt("markdown", markdown::try_parse(raw)) {
        return ParseOutcome { record, strategy: Strategy::Markdown };
    }

    tracing::debug!(strategy = "plainText", "falling back to plain text strategy");
    let record = plain_text::parse(raw);
    ParseOutcome { record, strategy: Strategy::PlainText }
}

fn attempt(name: &str, outcome: Option<DecisionRecord>) -> Option<DecisionRecord> {
    match &outcome {
        Some(_) => tracing::debug!(strategy = name, "strategy matched"),
        None => tracing::debug!(strategy = name, "strategy did not match, trying next"),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_json_wins_over_everything_else() {
        let outcome = parse(r#"{"taskComplete": true, "response": "4"}"#);
        assert_eq!(outcome.strategy, Strategy::Json);
        assert!(outcome.record.task_complete);
    }

    #[test]
    fn yaml_shaped_wins_when_json_does_not_match() {
        let outcome = parse("taskComplete: true\nresponse: done\n");
        assert_eq!(outcome.strategy, Strategy::YamlShaped);
    }

    #[test]
    fn markdown_wins_when_nothing_more_structured_matches() {
        let raw = "## Task Status\ntrue\n\n## Response\nThe task is complete.\n";
        let outcome = parse(raw);
        assert_eq!(outcome.strategy, Strategy::Markdown);
    }

    #[test]
    fn bare_code_block_with_stray_braces_falls_through_to_plain_text() {
        // A bare C# snippet: the brace-balancer finds `{` `}` pairs but
        // nothing inside parses as a JSON object, so every structured
        // strategy declines and plain text takes over.
        let raw = "```csharp\npublic class Foo {\n    void Bar() { Console.WriteLine(\"hi\"); }\n}\n```";
        let outcome = parse(raw);
        assert_eq!(outcome.strategy, Strategy::PlainText);
        assert!(outcome.record.task_complete);
        assert_eq!(outcome.record.response.as_deref(), Some(raw));
    }

    #[test]
    fn never_fails_on_empty_input() {
        let outcome = parse("");
        assert_eq!(outcome.strategy, Strategy::PlainText);
    }

    #[test]
    fn parser_idempotence_reparsing_the_response_field_is_stable() {
        // Parsing a JSON record, then re-parsing its own `response` text
        // (plain prose) must not crash and must produce a well-formed
        // record, satisfying the "apply parse to its own output" law.
        let first = parse(r#"{"taskComplete": true, "response": "The sum is 4."}"#);
        let second = parse(first.record.response.as_deref().unwrap_or_default());
        assert_eq!(second.record.response.as_deref(), Some("The sum is 4."));
    }

    #[test]
    fn parser_monotonicity_more_structure_never_loses_already_recognized_fields() {
        let minimal = parse("taskComplete: true\n");
        let richer = parse("taskComplete: true\nresponse: extra detail now present\n");
        assert!(minimal.record.task_complete);
        assert!(richer.record.task_complete);
        assert!(richer.record.response.is_some());
    }

    #[test]
    fn strategy_label_is_stable_for_diagnostics() {
        assert_eq!(Strategy::Json.label(), "json");
        assert_eq!(Strategy::PlainText.label(), "plainText");
    }
}
