use std::sync::Arc;
use std::time::Instant;

use orch_core::{ParamKind, ToolContext, ToolDescriptor, ToolResult};
use orch_sandbox::Sandbox;

use crate::tool::{Tool, ToolDescriptorBuilder};

/// Creates a directory (and any missing parents) inside the session
/// sandbox without moving the session's current directory into it. Named
/// to match the capability named in spec.md §8 scenario 3 (`fs:mkdir`).
pub struct DirectoryCreate {
    sandbox: Arc<Sandbox>,
    descriptor: ToolDescriptor,
}

impl DirectoryCreate {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self {
            sandbox,
            descriptor: ToolDescriptorBuilder::new("DirectoryCreate", "Creates a directory inside the session sandbox.")
                .capability("fs:mkdir")
                .requires_filesystem()
                .param("path", ParamKind::String, true, "directory path relative to the session root")
                .build(),
        }
    }
}

impl Tool for DirectoryCreate {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute(&self, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        let session = match ctx.session_id.clone() {
            Some(s) => s,
            None => return ToolResult::failed("no session bound to this tool context", "primary", elapsed(start)),
        };
        let path = match ctx.parameters.get("path").and_then(|v| v.as_str()) {
            Some(p) => p.to_string(),
            None => return ToolResult::failed("missing parameter 'path'", "primary", elapsed(start)),
        };
        match self.sandbox.create_dir(&session, &path) {
            Ok(resolved) => ToolResult::ok(resolved.display().to_string(), "primary", elapsed(start)),
            Err(e) => ToolResult::failed(e.to_string(), "primary", elapsed(start)),
        }
    }
}

/// Lists files and subdirectories of a sandbox directory. Capability
/// `fs:ls` per spec.md §8 scenario 3.
pub struct DirectoryList {
    sandbox: Arc<Sandbox>,
    descriptor: ToolDescriptor,
}

impl DirectoryList {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self {
            sandbox,
            descriptor: ToolDescriptorBuilder::new(
                "DirectoryList",
                "Lists files and subdirectories of a sandbox directory.",
            )
            .capability("fs:ls")
            .requires_filesystem()
            .param(
                "path",
                ParamKind::String,
                false,
                "directory to list, relative to the session root (defaults to '.')",
            )
            .build(),
        }
    }
}

impl Tool for DirectoryList {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute(&self, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        let session = match ctx.session_id.clone() {
            Some(s) => s,
            None => return ToolResult::failed("no session bound to this tool context", "primary", elapsed(start)),
        };
        let path = ctx
            .parameters
            .get("path")
            .and_then(|v| v.as_str())
            .unwrap_or(".")
            .to_string();

        let files = self.sandbox.list_files(&session, &path);
        let dirs = self.sandbox.list_dirs(&session, &path);
        match (files, dirs) {
            (Ok(files), Ok(dirs)) => {
                let mut out = String::new();
                for d in dirs {
                    out.push_str(&format!("{d}/\n"));
                }
                for f in files {
                    out.push_str(&format!("{f}\n"));
                }
                ToolResult::ok(out, "primary", elapsed(start))
            }
            (Err(e), _) | (_, Err(e)) => ToolResult::failed(e.to_string(), "primary", elapsed(start)),
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

    fn sandbox() -> (tempfile::TempDir, Arc<Sandbox>, SessionId) {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(Sandbox::new(dir.path()));
        let id = SessionId::parse("s1").unwrap();
        (dir, sandbox, id)
    }

    #[test]
    fn directory_create_makes_nested_dirs() {
        let (_dir, sandbox, id) = sandbox();
        let tool = DirectoryCreate::new(sandbox.clone());
        let mut ctx = ToolContext::new(id.clone()).with_param("path", ParamValue::String("a/b/c".into()));
        assert!(tool.execute(&mut ctx).success);
        assert!(sandbox.resolve_safe(&id, "a/b/c").unwrap().is_dir());
    }

    #[test]
    fn directory_list_separates_files_and_dirs() {
        let (_dir, sandbox, id) = sandbox();
        sandbox.write(&id, "readme.txt", b"x").unwrap();
        sandbox.change_dir(&id, "sub").unwrap();
        let tool = DirectoryList::new(sandbox);
        let mut ctx = ToolContext::new(id).with_param("path", ParamValue::String(".".into()));
        let result = tool.execute(&mut ctx);
        assert!(result.success);
        assert!(result.output.contains("sub/"));
        assert!(result.output.contains("readme.txt"));
    }

    #[test]
    fn directory_create_rejects_escape() {
        let (_dir, sandbox, id) = sandbox();
        let tool = DirectoryCreate::new(sandbox);
        let mut ctx = ToolContext::new(id).with_param("path", ParamValue::String("../outside".into()));
        assert!(!tool.execute(&mut ctx).success);
    }

    #[test]
    fn directory_create_does_not_move_the_session_current_dir() {
        let (_dir, sandbox, id) = sandbox();
        let root = sandbox.resolve_safe(&id, ".").unwrap();
        let tool = DirectoryCreate::new(sandbox.clone());
        let mut ctx = ToolContext::new(id.clone()).with_param("path", ParamValue::String("a/b/c".into()));
        assert!(tool.execute(&mut ctx).success);
        assert_eq!(sandbox.current_dir(&id).unwrap(), root);

        // A subsequent relative listing still resolves against the
        // session root, not the freshly created directory.
        let list_tool = DirectoryList::new(sandbox);
        let mut list_ctx = ToolContext::new(id).with_param("path", ParamValue::String(".".into()));
        let result = list_tool.execute(&mut list_ctx);
        assert!(result.success);
        assert!(result.output.contains("a/"));
    }
}
