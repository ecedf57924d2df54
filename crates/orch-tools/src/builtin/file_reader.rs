use std::sync::Arc;
use std::time::Instant;

use orch_core::{ParamKind, ToolContext, ToolDescriptor, ToolResult};
use orch_sandbox::Sandbox;

use crate::tool::{Tool, ToolDescriptorBuilder};

/// Reads a file out of the session sandbox. Primary method requires valid
/// UTF-8; the `read_lossy` alternative method degrades gracefully instead
/// of failing outright, giving the dispatcher something real to fall back
/// to (spec.md §4.C "alternative methods").
pub struct FileReader {
    sandbox: Arc<Sandbox>,
    descriptor: ToolDescriptor,
}

impl FileReader {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self {
            sandbox,
            descriptor: ToolDescriptorBuilder::new("FileReader", "Reads a text file from the session sandbox.")
                .capability("file:read")
                .requires_filesystem()
                .alternative_method("read_lossy")
                .param("path", ParamKind::String, true, "path relative to the session root")
                .build(),
        }
    }

    fn session_id(ctx: &ToolContext) -> Result<orch_core::SessionId, String> {
        ctx.session_id.clone().ok_or_else(|| "no session bound to this tool context".to_string())
    }

    fn path_param(ctx: &ToolContext) -> Result<String, String> {
        ctx.parameters
            .get("path")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| "missing parameter 'path'".to_string())
    }
}

impl Tool for FileReader {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute(&self, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        let (session, path) = match (Self::session_id(ctx), Self::path_param(ctx)) {
            (Ok(s), Ok(p)) => (s, p),
            (Err(e), _) | (_, Err(e)) => return ToolResult::failed(e, "primary", elapsed(start)),
        };
        match self.sandbox.read_to_string(&session, &path) {
            Ok(contents) => ToolResult::ok(contents, "primary", elapsed(start)),
            Err(e) => ToolResult::failed(e.to_string(), "primary", elapsed(start)),
        }
    }

    fn execute_method(&self, method: &str, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        if method != "read_lossy" {
            return ToolResult::failed(format!("no alternative method '{method}'"), method, elapsed(start));
        }
        let (session, path) = match (Self::session_id(ctx), Self::path_param(ctx)) {
            (Ok(s), Ok(p)) => (s, p),
            (Err(e), _) | (_, Err(e)) => return ToolResult::failed(e, method, elapsed(start)),
        };
        match self.sandbox.read(&session, &path) {
            Ok(bytes) => ToolResult::ok(String::from_utf8_lossy(&bytes).into_owned(), method, elapsed(start)),
            Err(e) => ToolResult::failed(e.to_string(), method, elapsed(start)),
        }
    }
}

fn elapsed(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
