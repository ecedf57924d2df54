//! Key normalization shared by every line-oriented parsing strategy
//! (YAML-shaped, key/value, markdown) plus the JSON strategy's object-key
//! mapping. Spec.md §4.D "Key normalization": a fixed alias table,
//! case-insensitive, ignoring punctuation and whitespace.

use orch_core::{DecisionRecord, ParamValue};

/// The canonical fields a [`DecisionRecord`] exposes, one variant per
/// field the parser ever sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TaskComplete,
    Response,
    RequiresTool,
    Tool,
    Parameters,
    NextStep,
    Reasoning,
    Confidence,
    Assumptions,
    Risks,
}

/// Strips everything but lowercase ASCII alphanumerics, so
/// `"Task Completed"`, `"task_completed"`, and `"complete?"` all collapse
/// to the same comparison key.
fn fold(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Maps a raw key (in any casing/punctuation the LLM chose) to a
/// canonical field, or `None` if it is not recognized — callers then
/// preserve it under `diagnostics` rather than dropping it.
pub fn normalize_key(raw: &str) -> Option<Field> {
    let folded = fold(raw);
    Some(match folded.as_str() {
        "taskcomplete" | "taskcompleted" | "complete" | "done" | "iscomplete" => Field::TaskComplete,
        "response" | "answer" | "finalanswer" | "result" => Field::Response,
        "requirestool" | "needstool" | "usetool" | "callstool" => Field::RequiresTool,
        "tool" | "toolname" | "toolcall" | "selectedtool" => Field::Tool,
        "parameters" | "params" | "args" | "arguments" | "toolparameters" => Field::Parameters,
        "nextstep" | "next" | "continuewith" => Field::NextStep,
        "reasoning" | "rationale" | "thought" | "thoughts" => Field::Reasoning,
        "confidence" | "confidencelevel" => Field::Confidence,
        "assumptions" => Field::Assumptions,
        "risks" | "risk" => Field::Risks,
        _ => return None,
    })
}

/// Parses a loosely-typed scalar string into a boolean using the same
/// tolerance the YAML-shaped strategy extends to `true`/`false`/`yes`/`no`/
/// `1`/`0`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Applies one string-valued key/value pair to `record`, recording it
/// under `diagnostics` when the key is unrecognized. Used by the
/// YAML-shaped, key/value, and markdown strategies, which all eventually
/// reduce to "a key and a raw string value".
pub fn apply_str_field(record: &mut DecisionRecord, key: &str, value: &str) {
    let value = value.trim();
    match normalize_key(key) {
        Some(Field::TaskComplete) => {
            if let Some(b) = parse_bool(value) {
                record.task_complete = b;
            }
        }
        Some(Field::Response) => record.response = Some(value.to_string()),
        Some(Field::RequiresTool) => {
            if let Some(b) = parse_bool(value) {
                record.requires_tool = b;
            }
        }
        Some(Field::Tool) => record.tool = Some(value.to_string()),
        Some(Field::Parameters) => {
            for pair in value.split(',') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                if let Some((k, v)) = pair.split_once('=').or_else(|| pair.split_once(':')) {
                    record
                        .parameters
                        .insert(k.trim().to_string(), ParamValue::String(v.trim().to_string()));
                }
            }
        }
        Some(Field::NextStep) => record.next_step = Some(value.to_string()),
        Some(Field::Reasoning) => record.reasoning = Some(value.to_string()),
        Some(Field::Confidence) => {
            if let Ok(f) = value.parse::<f64>() {
                record.confidence = Some(f);
            }
        }
        Some(Field::Assumptions) => record.assumptions.extend(split_list(value)),
        Some(Field::Risks) => record.risks.extend(split_list(value)),
        None => {
            record.diagnostics.insert(key.to_string(), value.to_string());
        }
    }
}

/// Splits a freeform list value on `;` or newlines, trimming blanks.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ';' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
