//! Three modes, one loop skeleton (spec.md §9 "Strategies vs. modes"):
//! a [`Strategy`] is plain data — a system-prompt preamble, an iteration
//! cap, and a completion hint shown to the model — never its own control
//! flow. [`ReasoningLoop::run`] is the single loop body every mode shares.

use std::collections::HashMap;

use orch_config::StrategyDefaults;

/// Per-mode knobs the loop consults; everything else about a turn is
/// identical regardless of which strategy is active.
#[derive(Clone, Debug)]
pub struct Strategy {
    pub system_preamble: &'static str,
    pub max_iterations: u32,
    pub completion_hint: &'static str,
}

const SINGLE_PREAMBLE: &str = "You are a focused assistant. Answer the user's query directly. \
Use a tool only if the query genuinely requires one; otherwise respond immediately with \
taskComplete=true.";

const COLLABORATIVE_PREAMBLE: &str = "You are working through a task step by step, narrating your \
plan as you go. Use tools when they help, and set nextStep to describe what you will do next \
until the task is truly finished.";

const INTELLIGENT_PREAMBLE: &str = "You are solving an open-ended task that may require several \
rounds of investigation. Decompose the problem, use tools to gather information or make changes, \
and only set taskComplete once the goal is verifiably met.";

/// Builds the mode registry. Iteration caps scale off the configured
/// default (`StrategyDefaults::max_iterations`) rather than hardcoding
/// independent constants per mode, so a single config knob still tunes
/// every mode's budget proportionally.
pub fn registry(defaults: &StrategyDefaults) -> HashMap<String, Strategy> {
    let base = defaults.max_iterations.max(1);
    let mut map = HashMap::new();
    map.insert(
        "single".to_string(),
        Strategy {
            system_preamble: SINGLE_PREAMBLE,
            max_iterations: base.min(3).max(1),
            completion_hint: "Prefer finishing in one turn.",
        },
    );
    map.insert(
        "collaborative".to_string(),
        Strategy {
            system_preamble: COLLABORATIVE_PREAMBLE,
            max_iterations: base,
            completion_hint: "Narrate each step via nextStep until the task is complete.",
        },
    );
    map.insert(
        "intelligent".to_string(),
        Strategy {
            system_preamble: INTELLIGENT_PREAMBLE,
            max_iterations: base.saturating_mul(2),
            completion_hint: "Investigate thoroughly before declaring taskComplete.",
        },
    );
    map
}
