use std::sync::Arc;
use std::time::Instant;

use orch_core::{ParamKind, ToolContext, ToolDescriptor, ToolResult};
use orch_sandbox::Sandbox;

use crate::tool::{Tool, ToolDescriptorBuilder};

/// Writes (overwrite) or appends text to a file inside the session sandbox.
/// The `append` alternative method is used when the primary overwrite fails
/// because the destination is a directory the LLM mistakenly named.
pub struct FileWriter {
    sandbox: Arc<Sandbox>,
    descriptor: ToolDescriptor,
}

impl FileWriter {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self {
            sandbox,
            descriptor: ToolDescriptorBuilder::new(
                "FileWriter",
                "Writes text to a file in the session sandbox, creating parent directories as needed.",
            )
            .capability("file:write")
            .requires_filesystem()
            .alternative_method("append")
            .param("path", ParamKind::String, true, "path relative to the session root")
            .param("contents", ParamKind::String, true, "text to write")
            .build(),
        }
    }

    fn args(ctx: &ToolContext) -> Result<(orch_core::SessionId, String, String), String> {
        let session = ctx.session_id.clone().ok_or("no session bound to this tool context")?;
        let path = ctx
            .parameters
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or("missing parameter 'path'")?
            .to_string();
        let contents = ctx
            .parameters
            .get("contents")
            .and_then(|v| v.as_str())
            .ok_or("missing parameter 'contents'")?
            .to_string();
        Ok((session, path, contents))
    }
}

impl Tool for FileWriter {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute(&self, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        let (session, path, contents) = match Self::args(ctx) {
            Ok(v) => v,
            Err(e) => return ToolResult::failed(e, "primary", elapsed(start)),
        };
        match self.sandbox.write(&session, &path, contents.as_bytes()) {
            Ok(()) => ToolResult::ok(format!("wrote {} bytes to {path}", contents.len()), "primary", elapsed(start)),
            Err(e) => ToolResult::failed(e.to_string(), "primary", elapsed(start)),
        }
    }

    fn execute_method(&self, method: &str, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        if method != "append" {
            return ToolResult::failed(format!("no alternative method '{method}'"), method, elapsed(start));
        }
        let (session, path, contents) = match Self::args(ctx) {
            Ok(v) => v,
            Err(e) => return ToolResult::failed(e, method, elapsed(start)),
        };
        match self.sandbox.append(&session, &path, contents.as_bytes()) {
            Ok(()) => ToolResult::ok(format!("appended {} bytes to {path}", contents.len()), method, elapsed(start)),
            Err(e) => ToolResult::failed(e.to_string(), method, elapsed(start)),
        }
    }
}

fn elapsed(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_core::{ParamValue, SessionId};

    fn fixture() -> (tempfile::TempDir, FileWriter, SessionId) {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let id = SessionId::parse("s1").unwrap();
        (dir, FileWriter::new(sandbox), id)
    }

    fn ctx(id: SessionId, path: &str, contents: &str) -> ToolContext {
        ToolContext::new(id)
            .with_param("path", ParamValue::String(path.into()))
            .with_param("contents", ParamValue::String(contents.into()))
    }

    #[test]
    fn write_then_read_back() {
        let (_dir, tool, id) = fixture();
        let mut c = ctx(id.clone(), "out.txt", "hello world");
        assert!(tool.execute(&mut c).success);
        assert_eq!(tool.sandbox.read_to_string(&id, "out.txt").unwrap(), "hello world");
    }

    #[test]
    fn append_alternative_adds_to_existing_file() {
        let (_dir, tool, id) = fixture();
        tool.sandbox.write(&id, "log.txt", b"first\n").unwrap();
        let mut c = ctx(id.clone(), "log.txt", "second\n");
        let result = tool.execute_method("append", &mut c);
        assert!(result.success);
        assert_eq!(tool.sandbox.read_to_string(&id, "log.txt").unwrap(), "first\nsecond\n");
    }

    #[test]
    fn rejects_escaping_path() {
        let (_dir, tool, id) = fixture();
        let mut c = ctx(id, "../outside.txt", "x");
        assert!(!tool.execute(&mut c).success);
    }
}
