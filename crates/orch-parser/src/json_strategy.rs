//! Strategy 1: JSON. Extracts the largest balanced `{...}` block
//! tolerating surrounding prose and fenced code blocks, repairs the two
//! most common LLM JSON mistakes (trailing commas, literal newlines
//! inside string values), then parses with `serde_json`.

use orch_core::{DecisionRecord, ParamValue};
use regex::Regex;

use crate::fields::{normalize_key, Field};

pub fn try_parse(raw: &str) -> Option<DecisionRecord> {
    let block = extract_largest_balanced_braces(raw)?;
    let value = serde_json::from_str::<serde_json::Value>(block)
        .ok()
        .or_else(|| serde_json::from_str::<serde_json::Value>(&repair(block)).ok())?;
    let object = value.as_object()?;

    let mut record = DecisionRecord::default();
    for (key, val) in object {
        apply_json_field(&mut record, key, val);
    }
    Some(record)
}

/// Scans the whole text for top-level (non-nested) `{...}` spans, honoring
/// string literals so braces inside quoted strings don't throw off depth
/// counting, and returns the longest one found.
fn extract_largest_balanced_braces(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    let mut depth = 0i32;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        let len = i + 1 - s;
                        if best.map(|(bs, be)| be - bs).unwrap_or(0) < len {
                            best = Some((s, i + 1));
                        }
                    }
                } else if depth < 0 {
                    depth = 0;
                }
            }
            _ => {}
        }
    }

    best.map(|(s, e)| &text[s..e])
}

/// Strips trailing commas before a closing brace/bracket and escapes bare
/// newlines found inside string literals (common when an LLM embeds a
/// multi-line code block in a JSON string without escaping it).
fn repair(block: &str) -> String {
    let trailing_comma = Regex::new(r",\s*([}\]])").expect("static regex is valid");
    let without_trailing_commas = trailing_comma.replace_all(block, "$1");

    let mut out = String::with_capacity(without_trailing_commas.len());
    let mut in_string = false;
    let mut escaped = false;
    for c in without_trailing_commas.chars() {
        if in_string {
            if escaped {
                out.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => {}
                _ => out.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
        }
    }
    out
}

fn apply_json_field(record: &mut DecisionRecord, key: &str, value: &serde_json::Value) {
    let Some(field) = normalize_key(key) else {
        record.diagnostics.insert(key.to_string(), value.to_string());
        return;
    };
    match field {
        Field::TaskComplete => {
            if let Some(b) = value.as_bool() {
                record.task_complete = b;
            }
        }
        Field::Response => {
            if let Some(s) = value.as_str() {
                record.response = Some(s.to_string());
            }
        }
        Field::RequiresTool => {
            if let Some(b) = value.as_bool() {
                record.requires_tool = b;
            }
        }
        Field::Tool => {
            if let Some(s) = value.as_str() {
                record.tool = Some(s.to_string());
            }
        }
        Field::Parameters => {
            if let Some(obj) = value.as_object() {
                for (k, v) in obj {
                    if let Some(pv) = json_to_param_value(v) {
                        record.parameters.insert(k.clone(), pv);
                    }
                }
            }
        }
        Field::NextStep => {
            if let Some(s) = value.as_str() {
                record.next_step = Some(s.to_string());
            }
        }
        Field::Reasoning => {
            if let Some(s) = value.as_str() {
                record.reasoning = Some(s.to_string());
            }
        }
        Field::Confidence => {
            if let Some(f) = value.as_f64() {
                record.confidence = Some(f);
            }
        }
        Field::Assumptions => record.assumptions.extend(json_string_array(value)),
        Field::Risks => record.risks.extend(json_string_array(value)),
    }
}

fn json_to_param_value(value: &serde_json::Value) -> Option<ParamValue> {
    match value {
        serde_json::Value::String(s) => Some(ParamValue::String(s.clone())),
        serde_json::Value::Bool(b) => Some(ParamValue::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ParamValue::Integer(i))
            } else {
                n.as_f64().map(ParamValue::Float)
            }
        }
        _ => None,
    }
}

fn json_string_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"taskComplete": true, "response": "4"}"#;
        let record = try_parse(raw).unwrap();
        assert!(record.task_complete);
        assert_eq!(record.response.as_deref(), Some("4"));
    }

    #[test]
    fn tolerates_surrounding_prose_and_fences() {
        let raw = "Sure, here you go:\n```json\n{\"taskComplete\": true, \"response\": \"done\"}\n```\nLet me know if you need more.";
        let record = try_parse(raw).unwrap();
        assert!(record.task_complete);
        assert_eq!(record.response.as_deref(), Some("done"));
    }

    #[test]
    fn picks_the_largest_balanced_block_when_several_exist() {
        let raw = r#"{"x": 1} then {"taskComplete": true, "response": "the real one", "nested": {"a": 1}}"#;
        let record = try_parse(raw).unwrap();
        assert_eq!(record.response.as_deref(), Some("the real one"));
    }

    #[test]
    fn repairs_trailing_commas() {
        let raw = r#"{"taskComplete": true, "response": "ok",}"#;
        let record = try_parse(raw).unwrap();
        assert!(record.task_complete);
    }

    #[test]
    fn repairs_bare_newlines_inside_strings() {
        let raw = "{\"taskComplete\": true, \"response\": \"line one\nline two\"}";
        let record = try_parse(raw).unwrap();
        assert_eq!(record.response.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn maps_parameters_object_and_lists() {
        let raw = r#"{
            "requiresTool": true,
            "tool": "FileReader",
            "parameters": {"path": "a.txt", "retries": 3},
            "assumptions": ["file exists"],
            "risks": ["path might be wrong"]
        }"#;
        let record = try_parse(raw).unwrap();
        assert_eq!(record.tool.as_deref(), Some("FileReader"));
        assert_eq!(record.parameters.get("path").unwrap().as_str(), Some("a.txt"));
        assert_eq!(record.assumptions, vec!["file exists".to_string()]);
        assert_eq!(record.risks, vec!["path might be wrong".to_string()]);
    }

    #[test]
    fn no_braces_returns_none() {
        assert!(try_parse("just plain text, no json here").is_none());
    }

    #[test]
    fn unknown_keys_go_to_diagnostics() {
        let raw = r#"{"taskComplete": true, "response": "ok", "mood": "confident"}"#;
        let record = try_parse(raw).unwrap();
        assert!(record.diagnostics.contains_key("mood"));
    }
}
