use std::sync::Arc;
use std::time::Instant;

use orch_core::{ParamKind, ToolContext, ToolDescriptor, ToolResult};
use orch_sandbox::Sandbox;

use crate::tool::{Tool, ToolDescriptorBuilder};

/// Downloads a remote archive into `repo/` under the session sandbox and
/// publishes its location as `state["repoPath"]` for a later tool in the
/// same reasoning loop to consume (the `repoPath` cross-tool pattern named
/// in spec.md §9). Falls back to a shallow `git clone` when the primary
/// HTTP fetch fails, matching the capability named `repo:download` in
/// spec.md §8 scenario 3.
pub struct RepoDownload {
    sandbox: Arc<Sandbox>,
    descriptor: ToolDescriptor,
}

impl RepoDownload {
    pub fn new(sandbox: Arc<Sandbox>) -> Self {
        Self {
            sandbox,
            descriptor: ToolDescriptorBuilder::new(
                "RepoDownload",
                "Downloads a remote repository archive into the session sandbox.",
            )
            .capability("repo:download")
            .requires_network()
            .requires_filesystem()
            .alternative_method("git_clone")
            .param("url", ParamKind::String, true, "URL of the archive or git repository")
            .build(),
        }
    }

    fn url_param(ctx: &ToolContext) -> Result<String, String> {
        ctx.parameters
            .get("url")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| "missing parameter 'url'".to_string())
    }
}

impl Tool for RepoDownload {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    fn execute(&self, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        let session = match ctx.session_id.clone() {
            Some(s) => s,
            None => return ToolResult::failed("no session bound to this tool context", "primary", elapsed(start)),
        };
        let url = match Self::url_param(ctx) {
            Ok(u) => u,
            Err(e) => return ToolResult::failed(e, "primary", elapsed(start)),
        };

        let bytes = match reqwest::blocking::get(&url).and_then(|r| r.error_for_status()).and_then(|r| r.bytes()) {
            Ok(bytes) => bytes,
            Err(e) => return ToolResult::failed(format!("HTTP fetch failed: {e}"), "primary", elapsed(start)),
        };

        match self.sandbox.write(&session, "repo/archive.bin", &bytes) {
            Ok(()) => {
                ctx.state.insert("repoPath".to_string(), "repo".to_string());
                ToolResult::ok(format!("downloaded {} bytes to repo/archive.bin", bytes.len()), "primary", elapsed(start))
            }
            Err(e) => ToolResult::failed(e.to_string(), "primary", elapsed(start)),
        }
    }

    fn execute_method(&self, method: &str, ctx: &mut ToolContext) -> ToolResult {
        let start = Instant::now();
        if method != "git_clone" {
            return ToolResult::failed(format!("no alternative method '{method}'"), method, elapsed(start));
        }
        let session = match ctx.session_id.clone() {
            Some(s) => s,
            None => return ToolResult::failed("no session bound to this tool context", method, elapsed(start)),
        };
        let url = match Self::url_param(ctx) {
            Ok(u) => u,
            Err(e) => return ToolResult::failed(e, method, elapsed(start)),
        };
        let dest = match self.sandbox.resolve_safe(&session, "repo") {
            Ok(p) => p,
            Err(e) => return ToolResult::failed(e.to_string(), method, elapsed(start)),
        };
        let cwd = match self.sandbox.safe_working_directory(&session) {
            Ok(p) => p,
            Err(e) => return ToolResult::failed(e.to_string(), method, elapsed(start)),
        };

        let output = std::process::Command::new("git")
            .current_dir(&cwd)
            .args(["clone", "--depth", "1", &url, dest.to_string_lossy().as_ref()])
            .output();

        match output {
            Ok(out) if out.status.success() => {
                ctx.state.insert("repoPath".to_string(), "repo".to_string());
                ToolResult::ok("cloned repository into repo/", method, elapsed(start))
            }
            Ok(out) => ToolResult::failed(String::from_utf8_lossy(&out.stderr).into_owned(), method, elapsed(start)),
            Err(e) => ToolResult::failed(format!("failed to spawn git: {e}"), method, elapsed(start)),
        }
    }
}

fn elapsed(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
