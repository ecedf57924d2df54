//! Strategy 4: markdown sections. Maps `## Heading` (or `**Heading:**`)
//! lines to canonical fields and takes everything until the next heading
//! as that field's value.

use orch_core::DecisionRecord;

use crate::fields::apply_str_field;

pub fn try_parse(raw: &str) -> Option<DecisionRecord> {
    let mut record = DecisionRecord::default();
    let mut matched_any = false;

    let mut current_key: Option<String> = None;
    let mut buffer: Vec<&str> = Vec::new();

    let flush = |key: &Option<String>, buffer: &mut Vec<&str>, record: &mut DecisionRecord, matched_any: &mut bool| {
        if let Some(key) = key {
            let value = buffer.join("\n").trim().to_string();
            if !value.is_empty() {
                apply_str_field(record, key, &value);
                *matched_any = true;
            }
        }
        buffer.clear();
    };

    for line in raw.lines() {
        if let Some(heading) = heading_text(line) {
            flush(&current_key, &mut buffer, &mut record, &mut matched_any);
            current_key = Some(heading);
        } else {
            buffer.push(line);
        }
    }
    flush(&current_key, &mut buffer, &mut record, &mut matched_any);

    matched_any.then_some(record)
}

/// Recognizes `## Heading`, `### Heading`, and `**Heading:**` lines, and
/// returns the heading text stripped of markup.
fn heading_text(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("###") {
        return non_empty(rest.trim_start_matches('#').trim());
    }
    if let Some(rest) = trimmed.strip_prefix("##") {
        return non_empty(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix('#') {
        return non_empty(rest.trim());
    }
    if trimmed.starts_with("**") {
        let inner = trimmed.trim_start_matches('*').trim_end_matches('*').trim();
        let inner = inner.strip_suffix(':').unwrap_or(inner);
        return non_empty(inner.trim());
    }
    None
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
