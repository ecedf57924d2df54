//! Strategy 5: plain text, the fallback that never fails. The entire body
//! becomes the response; `taskComplete` is inferred from keyword
//! heuristics rather than left to default to `false` outright, since a
//! model that dropped all structure usually still wrote a complete answer.

use orch_core::DecisionRecord;

const COMPLETION_HINTS: &[&str] = &[
    "here's your",
    "here is your",
    "completed",
    "created successfully",
    "done",
    "finished",
    "the answer is",
];

const CONTINUATION_HINTS: &[&str] = &["need to", "next step", "requires", "i will", "let me"];

/// Always succeeds; this is the terminal strategy in the cascade.
pub fn parse(raw: &str) -> DecisionRecord {
    let mut record = DecisionRecord::default();
    let trimmed = raw.trim();
    record.response = Some(trimmed.to_string());

    let lower = trimmed.to_ascii_lowercase();
    let has_code_block = trimmed.contains("```");
    let completion_hit = COMPLETION_HINTS.iter().any(|hint| lower.contains(hint));
    let continuation_hit = CONTINUATION_HINTS.iter().any(|hint| lower.contains(hint));

    record.task_complete = if completion_hit && !continuation_hit {
        true
    } else if has_code_block && !continuation_hit {
        true
    } else {
        !continuation_hit && !lower.is_empty()
    };

    record
        .diagnostics
        .insert("parseStrategy".to_string(), "plainText".to_string());
    record
}
