use std::sync::Arc;
use std::time::Instant;

use orch_core::{ParamKind, ToolContext, ToolDescriptor, ToolResult};
use orch_sandbox::Sandbox;

use crate::tool::{Tool, ToolDescriptorBuilder};

/// Walks a sandbox directory recursively and summarizes file counts, total
/// bytes, and the most common extensions. Capability `fs:analyze` per
/// spec.md §8 scenario 3 (`DirectoryCreate`, `DirectoryList`,
/// `FileSystemAnalyzer` cover `fs:mkdir`/`fs:ls`/`fs:analyze` respectively).
pub struct FileSystemAnalyzer {
    sandbox: Arc<Sandbox>,
    descriptor: ToolDescriptor,
}

impl FileSystemAnalyzer {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self {
            sandbox,
            descriptor: ToolDescriptorBuilder::new(
                "FileSystemAnalyzer",
                "Recursively summarizes file counts, total size, and extensions under a sandbox directory.",
            )
            .capability("fs:analyze")
            .requires_filesystem()
            .param(
                "path",
                ParamKind::String,
                false,
                "directory to analyze, relative to the session root (defaults to '.')",
            )
            .build(),
        }
    }

    fn walk(&self, session: &orch_core::SessionId, relative: &str) -> Result<Summary, orch_sandbox::SandboxError> {
        let mut summary = Summary::default();
        let root = self.sandbox.resolve_safe(session, relative)?;
        self.walk_path(&root, &mut summary)?;
        Ok(summary)
    }

    fn walk_path(&self, path: &std::path::Path, summary: &mut Summary) -> Result<(), orch_sandbox::SandboxError> {
        let entries = std::fs::read_dir(path)
            .map_err(|e| orch_sandbox::SandboxError::Io(path.display().to_string(), e.to_string()))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| orch_sandbox::SandboxError::Io(path.display().to_string(), e.to_string()))?;
            let metadata = entry
                .metadata()
                .map_err(|e| orch_sandbox::SandboxError::Io(path.display().to_string(), e.to_string()))?;
            if metadata.is_dir() {
                summary.directories += 1;
                self.walk_path(&entry.path(), summary)?;
            } else {
                summary.files += 1;
                summary.bytes += metadata.len();
                let ext = entry
                    .path()
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "<none>".to_string());
                *summary.extensions.entry(ext).or_insert(0) += 1;
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Summary {
    files: u64,
    directories: u64,
    bytes: u64,
    extensions: std::collections::BTreeMap<String, u64>,
}

impl Tool for FileSystemAnalyzer {
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

        match self.walk(&session, &path) {
            Ok(summary) => {
                let mut out = format!(
                    "files={} directories={} bytes={}\n",
                    summary.files, summary.directories, summary.bytes
                );
                for (ext, count) in &summary.extensions {
                    out.push_str(&format!("  .{ext}: {count}\n"));
                }
                ToolResult::ok(out, "primary", elapsed(start))
            }
            Err(e) => ToolResult::failed(e.to_string(), "primary", elapsed(start)),
        }
    }
}

fn elapsed(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
