//! Strategies 2 and 3: the YAML-shaped scanner (`key: value` lines, with
//! `|` block-scalar continuation while indentation holds) and the flatter
//! key/value scanner (`key = value`, `key - value`, one pair per line with
//! no indentation semantics). Both reduce to [`fields::apply_str_field`].

use orch_core::DecisionRecord;

use crate::fields::apply_str_field;

/// `key: value` pairs, one per line, with an optional `key: |` block
/// scalar whose body is every following line indented deeper than the
/// key line until indentation returns to the key's level or the input
/// ends.
pub fn try_parse_yaml_shaped(raw: &str) -> Option<DecisionRecord> {
    let lines: Vec<&str> = raw.lines().collect();
    let mut record = DecisionRecord::default();
    let mut matched_any = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            i += 1;
            continue;
        }
        let indent = line.len() - trimmed.len();
        let Some((key, rest)) = trimmed.split_once(':') else {
            i += 1;
            continue;
        };
        if key.trim().is_empty() || key.trim().contains(' ') && !key.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '_') {
            i += 1;
            continue;
        }

        let rest = rest.trim();
        if rest == "|" || rest == ">" {
            let mut block = Vec::new();
            i += 1;
            while i < lines.len() {
                let candidate = lines[i];
                if candidate.trim().is_empty() {
                    block.push(String::new());
                    i += 1;
                    continue;
                }
                let candidate_indent = candidate.len() - candidate.trim_start().len();
                if candidate_indent <= indent {
                    break;
                }
                block.push(candidate.trim_start().to_string());
                i += 1;
            }
            while block.last().is_some_and(|l| l.is_empty()) {
                block.pop();
            }
            apply_str_field(&mut record, key.trim(), &block.join("\n"));
            matched_any = true;
            continue;
        }

        apply_str_field(&mut record, key.trim(), rest);
        matched_any = true;
        i += 1;
    }

    matched_any.then_some(record)
}

/// `key = value` / `key - value`, one pair per line, no continuation
/// semantics. Tried after the YAML-shaped scanner so a plain `key: value`
/// file is handled there first.
pub fn try_parse_key_value(raw: &str) -> Option<DecisionRecord> {
    let mut record = DecisionRecord::default();
    let mut matched_any = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let split = trimmed
            .split_once('=')
            .or_else(|| trimmed.split_once(" - ").map(|(k, v)| (k, v)));
        if let Some((key, value)) = split {
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) && key.split_whitespace().count() > 3 {
                continue;
            }
            apply_str_field(&mut record, key, value.trim());
            matched_any = true;
        }
    }

    matched_any.then_some(record)
}
