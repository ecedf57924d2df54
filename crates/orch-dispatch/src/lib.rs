//! Tool Dispatcher (spec.md §4.C): the only point through which the
//! reasoning loop reaches a tool. Validates parameters, enforces the
//! session binding, runs the primary method with an alternative-method
//! fallback chain, and answers `MISSING_TOOL` confessions with a
//! capability-coverage report instead of an error.

use std::sync::Arc;

use orch_core::{ParamKind, ToolContext, ToolResult, MISSING_TOOL};
use orch_tools::ToolRegistry;

/// Dispatches tool invocations against a shared, read-only registry. The
/// dispatcher itself is stateless; any persistence a tool performs happens
/// through the sandbox it was handed in `ctx`. Cheap to clone (an `Arc`
/// wrapper around the registry), so callers can move an owned copy onto a
/// blocking thread for tools that perform blocking I/O.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Runs `tool_name` against `ctx`, or the `MISSING_TOOL` reflection
    /// path when the LLM admits nothing catalogued fits.
    pub fn dispatch(&self, tool_name: &str, ctx: &mut ToolContext) -> ToolResult {
        if ctx.session_id.is_none() {
            return ToolResult::failed("tool dispatch requires a bound session id", "dispatch", 0);
        }

        if tool_name.eq_ignore_ascii_case(MISSING_TOOL) {
            return self.reflect(ctx);
        }

        let Some(tool) = self.registry.lookup(tool_name) else {
            return self.unknown_tool(tool_name, ctx);
        };

        if let Some(problem) = validate_parameters(tool.descriptor(), ctx) {
            tracing::debug!(tool = tool_name, problem = %problem, "parameter validation failed");
            return ToolResult::failed(problem, "validate", 0);
        }

        tracing::debug!(tool = tool_name, "dispatching primary method");
        let primary = tool.execute(ctx);
        if primary.success {
            tracing::info!(tool = tool_name, method = %primary.method_used, "tool succeeded");
            return primary;
        }

        let alternatives = tool.descriptor().alternative_methods.clone();
        if alternatives.is_empty() {
            tracing::warn!(tool = tool_name, error = ?primary.error, "tool failed, no alternative methods");
            return primary;
        }

        let mut chain = vec![format!("primary: {}", primary.error.clone().unwrap_or_default())];
        let mut last = primary;
        for method in alternatives {
            ctx.method_override = Some(method.clone());
            tracing::debug!(tool = tool_name, method = %method, "attempting alternative method");
            let attempt = tool.execute_method(&method, ctx);
            if attempt.success {
                tracing::info!(tool = tool_name, method = %method, "alternative method succeeded");
                return attempt;
            }
            chain.push(format!("{method}: {}", attempt.error.clone().unwrap_or_default()));
            last = attempt;
        }
        ctx.method_override = None;

        tracing::warn!(tool = tool_name, chain = %chain.join(" | "), "every method failed");
        ToolResult::failed(
            format!("all methods failed: {}", chain.join(" | ")),
            last.method_used,
            last.duration_ms,
        )
    }

    fn unknown_tool(&self, tool_name: &str, ctx: &ToolContext) -> ToolResult {
        let closest = self.registry.closest_names(tool_name, 3);
        let requested_capabilities: Vec<&str> = ctx
            .parameters
            .get("capabilities")
            .and_then(|v| v.as_str())
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let mut message = format!("unknown tool '{tool_name}'.");
        if !closest.is_empty() {
            message.push_str(&format!(" closest names: {}.", closest.join(", ")));
        }
        for cap in &requested_capabilities {
            let matches: Vec<&str> = self
                .registry
                .by_capability(cap)
                .into_iter()
                .map(|t| t.descriptor().name.as_str())
                .collect();
            if matches.is_empty() {
                message.push_str(&format!(" no tool supplies capability '{cap}'."));
            } else {
                message.push_str(&format!(" capability '{cap}' is supplied by: {}.", matches.join(", ")));
            }
        }
        tracing::warn!(tool = tool_name, %message, "dispatch: unknown tool");
        ToolResult::failed(message, "dispatch", 0)
    }

    /// The `MISSING_TOOL` reflection path: intersects the LLM's requested
    /// capabilities against the registry's capability index and returns a
    /// report as a *successful* tool result, so the next prompt can carry
    /// it back to the model (spec.md §4.C).
    fn reflect(&self, ctx: &ToolContext) -> ToolResult {
        let required_name = ctx
            .parameters
            .get("requiredToolName")
            .and_then(|v| v.as_str())
            .unwrap_or("<unnamed>");
        let reason = ctx.parameters.get("reason").and_then(|v| v.as_str()).unwrap_or("");
        let capabilities: Vec<&str> = ctx
            .parameters
            .get("requiredCapabilities")
            .and_then(|v| v.as_str())
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let mut report = format!("MISSING_TOOL reflection for '{required_name}' ({reason}):\n");
        if capabilities.is_empty() {
            report.push_str("no requiredCapabilities were supplied.\n");
        }
        for cap in &capabilities {
            let supplying = self.registry.by_capability(cap);
            if supplying.is_empty() {
                report.push_str(&format!("- {cap}: no catalogued tool supplies this capability\n"));
            } else {
                let names: Vec<&str> = supplying.iter().map(|t| t.descriptor().name.as_str()).collect();
                report.push_str(&format!("- {cap}: {}\n", names.join(", ")));
            }
        }

        tracing::info!(required_name, capabilities = ?capabilities, "MISSING_TOOL reflection served");
        ToolResult::ok(report, "reflection", 0)
    }
}

/// Every required parameter present and of the declared scalar kind;
/// missing or mistyped parameters fail validation with no side effects,
/// so a tool's `execute` never runs against a malformed context even if
/// the response parser accepted the decision that produced it.
fn validate_parameters(descriptor: &orch_core::ToolDescriptor, ctx: &ToolContext) -> Option<String> {
    for spec in &descriptor.parameters {
        match ctx.parameters.get(&spec.name) {
            None if spec.required => {
                return Some(format!("missing required parameter '{}'", spec.name));
            }
            None => {}
            Some(value) => {
                let actual = value.kind();
                let compatible = actual == spec.kind
                    || (spec.kind == ParamKind::Float && actual == ParamKind::Integer);
                if !compatible {
                    return Some(format!(
                        "parameter '{}' expected {} but got {}",
                        spec.name, spec.kind, actual
                    ));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_core::{ParamValue, SessionId};
    use orch_tools::builtin;

    fn dispatcher() -> (tempfile::TempDir, Dispatcher, SessionId) {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(orch_sandbox::Sandbox::new(dir.path()));
        let registry = Arc::new(builtin::register_all(sandbox).unwrap());
        let id = SessionId::parse("s1").unwrap();
        (dir, Dispatcher::new(registry), id)
    }

    #[test]
    fn dispatches_known_tool() {
        let (_dir, dispatcher, id) = dispatcher();
        let mut ctx = ToolContext::new(id)
            .with_param("lhs", ParamValue::Float(2.0))
            .with_param("op", ParamValue::String("+".into()))
            .with_param("rhs", ParamValue::Float(2.0));
        let result = dispatcher.dispatch("ArithmeticTool", &mut ctx);
        assert!(result.success);
        assert_eq!(result.output, "4");
    }

    #[test]
    fn missing_required_parameter_fails_before_execution() {
        let (_dir, dispatcher, id) = dispatcher();
        let mut ctx = ToolContext::new(id).with_param("lhs", ParamValue::Float(2.0));
        let result = dispatcher.dispatch("ArithmeticTool", &mut ctx);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("missing required parameter"));
    }

    #[test]
    fn mistyped_parameter_fails_validation() {
        let (_dir, dispatcher, id) = dispatcher();
        let mut ctx = ToolContext::new(id)
            .with_param("lhs", ParamValue::String("two".into()))
            .with_param("op", ParamValue::String("+".into()))
            .with_param("rhs", ParamValue::Float(2.0));
        let result = dispatcher.dispatch("ArithmeticTool", &mut ctx);
        assert!(!result.success);
    }

    #[test]
    fn integer_satisfies_float_parameter() {
        let (_dir, dispatcher, id) = dispatcher();
        let mut ctx = ToolContext::new(id)
            .with_param("lhs", ParamValue::Integer(2))
            .with_param("op", ParamValue::String("+".into()))
            .with_param("rhs", ParamValue::Integer(2));
        let result = dispatcher.dispatch("ArithmeticTool", &mut ctx);
        assert!(result.success);
    }

    #[test]
    fn unknown_tool_reports_closest_match() {
        let (_dir, dispatcher, id) = dispatcher();
        let mut ctx = ToolContext::new(id);
        let result = dispatcher.dispatch("ArithmetcTool", &mut ctx);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("arithmetictool"));
    }

    #[test]
    fn alternative_method_recovers_from_primary_failure() {
        let (_dir, dispatcher, id) = dispatcher();
        // FileWriter's primary write fails on a missing `contents`, no
        // alternative declared for that kind of failure, so instead we
        // exercise FileReader's read_lossy alternative directly via
        // invalid UTF-8 content written ahead of time.
        let sandbox_dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(orch_sandbox::Sandbox::new(sandbox_dir.path()));
        sandbox.write(&id, "bin.dat", &[0xff, 0xfe, b'h', b'i']).unwrap();
        let registry = Arc::new(builtin::register_all(sandbox).unwrap());
        let dispatcher = Dispatcher::new(registry);
        let mut ctx = ToolContext::new(id).with_param("path", ParamValue::String("bin.dat".into()));
        let result = dispatcher.dispatch("FileReader", &mut ctx);
        assert!(result.success);
        assert_eq!(result.method_used, "read_lossy");
    }

    #[test]
    fn missing_tool_sentinel_triggers_reflection_report() {
        let (_dir, dispatcher, id) = dispatcher();
        let mut ctx = ToolContext::new(id)
            .with_param("requiredToolName", ParamValue::String("DirMaker".into()))
            .with_param(
                "requiredCapabilities",
                ParamValue::String("fs:mkdir,fs:ls,fs:analyze".into()),
            )
            .with_param("reason", ParamValue::String("need to organize files".into()));
        let result = dispatcher.dispatch(MISSING_TOOL, &mut ctx);
        assert!(result.success);
        assert!(result.output.contains("DirectoryCreate"));
        assert!(result.output.contains("DirectoryList"));
        assert!(result.output.contains("FileSystemAnalyzer"));
    }

    #[test]
    fn reflection_reports_uncovered_capability() {
        let (_dir, dispatcher, id) = dispatcher();
        let mut ctx = ToolContext::new(id).with_param(
            "requiredCapabilities",
            ParamValue::String("quantum:teleport".into()),
        );
        let result = dispatcher.dispatch(MISSING_TOOL, &mut ctx);
        assert!(result.success);
        assert!(result.output.contains("no catalogued tool supplies this capability"));
    }

    #[test]
    fn dispatch_without_session_fails() {
        let (_dir, dispatcher, _id) = dispatcher();
        let mut ctx = ToolContext::default();
        let result = dispatcher.dispatch("ArithmeticTool", &mut ctx);
        assert!(!result.success);
    }
}
