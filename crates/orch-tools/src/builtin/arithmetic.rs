use std::time::Instant;

use orch_core::{ParamKind, ToolContext, ToolDescriptor, ToolResult};

use crate::tool::{Tool, ToolDescriptorBuilder};

/// Evaluates a single binary arithmetic expression (`lhs op rhs`). Grounded
/// in spec.md §8 boundary scenario 6: the reasoning loop dispatches this
/// tool for `"What is 2 + 2"` and observes `4` in the next iteration.
pub struct ArithmeticTool {
    descriptor: ToolDescriptor,
}

#[allow(clippy::new_without_default)]
impl ArithmeticTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptorBuilder::new(
                "ArithmeticTool",
                "Evaluates a binary arithmetic expression: lhs op rhs, op in + - * /.",
            )
            .capability("math:evaluate")
            .param("lhs", ParamKind::Float, true, "left-hand operand")
            .param("op", ParamKind::String, true, "one of + - * /")
            .param("rhs", ParamKind::Float, true, "right-hand operand")
            .build(),
        }
    }
}

impl Default for ArithmeticTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ArithmeticTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute(&self, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        let lhs = match number_param(ctx, "lhs") {
            Ok(v) => v,
            Err(e) => return ToolResult::failed(e, "primary", elapsed_ms(start)),
        };
        let rhs = match number_param(ctx, "rhs") {
            Ok(v) => v,
            Err(e) => return ToolResult::failed(e, "primary", elapsed_ms(start)),
        };
        let op = match ctx.parameters.get("op").and_then(|v| v.as_str()) {
            Some(op) => op,
            None => return ToolResult::failed("missing parameter 'op'", "primary", elapsed_ms(start)),
        };

        let result = match op {
            "+" => lhs + rhs,
            "-" => lhs - rhs,
            "*" => lhs * rhs,
            "/" if rhs != 0.0 => lhs / rhs,
            "/" => {
                return ToolResult::failed("division by zero", "primary", elapsed_ms(start));
            }
            other => {
                return ToolResult::failed(
                    format!("unsupported operator '{other}'"),
                    "primary",
                    elapsed_ms(start),
                );
            }
        };

        let rendered = if result.fract() == 0.0 {
            format!("{result:.0}")
        } else {
            result.to_string()
        };
        ctx.state.insert("tool:ArithmeticTool:result".to_string(), rendered.clone());
        ToolResult::ok(rendered, "primary", elapsed_ms(start))
    }
}

fn number_param(ctx: &ToolContext, name: &str) -> Result<f64, String> {
    match ctx.parameters.get(name) {
        Some(orch_core::ParamValue::Float(f)) => Ok(*f),
        Some(orch_core::ParamValue::Integer(i)) => Ok(*i as f64),
        Some(other) => Err(format!("parameter '{name}' is not numeric: {other}")),
        None => Err(format!("missing parameter '{name}'")),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
