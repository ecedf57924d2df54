//! Session Logger (spec.md §4.F): append-only, file-per-category logging
//! under a session's cache directory. Generalizes this codebase's
//! `create_session_log_writer` (one `logs/run-{timestamp}.log` writer per
//! session) into one append target per category, routed by a thin
//! category-to-path map instead of a single stream.
//!
//! Every write is best-effort: a failure is downgraded to `tracing::warn!`
//! and never propagated, so a full disk or a permissions problem cannot
//! abort the reasoning loop.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initializes the process-wide `tracing` subscriber: human-readable output
/// to stderr for the operator, plus a rolling daily file under
/// `<cache_root>/logs/` for offline inspection. Mirrors this codebase's
/// `create_session_log_writer`, generalized from one file per session to
/// one rolling file per process.
///
/// The returned guard must be kept alive for the process lifetime, or the
/// non-blocking file writer stops flushing as soon as it is dropped.
pub fn init_tracing(cache_root: &Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = cache_root.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "orchestrator.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);
    let filter = tracing_subscriber::EnvFilter::from_default_env();

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();

    Ok(guard)
}

/// Which categorical stream an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Interaction,
    ToolExecution,
    Thinking,
    Plan,
    Action,
    SessionInfo,
}

impl Category {
    fn relative_path(self) -> &'static str {
        match self {
            Category::Interaction => "interactions/session.txt",
            Category::ToolExecution => "tools/tool_execution_log.txt",
            Category::Thinking => "thinking/session.txt",
            Category::Plan => "plans/session.txt",
            Category::Action => "actions/session.txt",
            Category::SessionInfo => "session_info_log.txt",
        }
    }

    fn banner(self) -> &'static str {
        match self {
            Category::Interaction => "INTERACTION",
            Category::ToolExecution => "TOOL",
            Category::Thinking => "THINKING",
            Category::Plan => "PLAN",
            Category::Action => "ACTION",
            Category::SessionInfo => "SESSION",
        }
    }
}

/// One append-only JSON-Lines record in `tools/tool_execution_detailed.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolExecutionRecord<'a> {
    pub timestamp: String,
    pub iteration: u32,
    pub tool: &'a str,
    pub method: &'a str,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// Writes every categorical stream for one session under
/// `<cache_root>/<session_id>/`.
pub struct SessionLogger {
    session_dir: PathBuf,
}

impl SessionLogger {
    /// Creates every category's parent directory up front so a first write
    /// never has to create-on-demand under lock contention.
    pub fn new(session_dir: impl Into<PathBuf>) -> Self {
        let session_dir = session_dir.into();
        for category in [
            Category::Interaction,
            Category::ToolExecution,
            Category::Thinking,
            Category::Plan,
            Category::Action,
            Category::SessionInfo,
        ] {
            if let Some(parent) = session_dir.join(category.relative_path()).parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::warn!(path = %parent.display(), error = %e, "failed to create log directory");
                }
            }
        }
        Self { session_dir }
    }

    /// Appends one timestamped, banner-prefixed line to `category`'s file.
    /// Never panics or propagates: on failure it logs a `tracing::warn!`
    /// and returns.
    pub fn log(&self, category: Category, iteration: u32, message: &str) {
        let line = format!(
            "[{}] iter={} {} {}\n",
            Utc::now().to_rfc3339(),
            iteration,
            category.banner(),
            message
        );
        self.append(&self.session_dir.join(category.relative_path()), line.as_bytes());
    }

    /// Appends one JSON-Lines record to `tools/tool_execution_detailed.json`.
    pub fn log_tool_execution_detailed(&self, record: &ToolExecutionRecord<'_>) {
        let mut line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize tool execution record");
                return;
            }
        };
        line.push('\n');
        self.append(
            &self.session_dir.join("tools/tool_execution_detailed.json"),
            line.as_bytes(),
        );
    }

    fn append(&self, path: &Path, bytes: &[u8]) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(bytes)
        })();
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "session log write failed");
        }
    }
}
