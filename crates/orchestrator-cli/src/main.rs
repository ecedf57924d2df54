use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use orch_core::{Mode, SessionId};
use orch_llm::ClientSelector;
use orch_loop::ReasoningLoop;
use orch_sandbox::Sandbox;
use tokio_util::sync::CancellationToken;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let repo_root = orch_config::discover_repo_root(&cwd);
    let cache_root = repo_root.join("cache");

    // Keep the guard alive for the process lifetime: dropping it stops the
    // non-blocking file writer from flushing.
    let _tracing_guard = orch_logger::init_tracing(&cache_root).ok();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| repo_root.join("orchestrator.json"));
    let config = orch_config::Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    let mode = Mode::from_str(&cli.mode).with_context(|| format!("invalid mode '{}'", cli.mode))?;

    let session_id = match cli.session {
        Some(raw) => SessionId::parse(raw).context("invalid --session id")?,
        None => SessionId::parse(ulid::Ulid::new().to_string()).expect("a freshly generated ULID is always filename-safe"),
    };
    tracing::info!(session = %session_id, mode = cli.mode.as_str(), "starting query");

    let sandbox = Arc::new(Sandbox::new(cache_root));
    let registry = Arc::new(
        orch_tools::builtin::register_all(sandbox.clone()).context("failed to register built-in tools")?,
    );
    let llm = ClientSelector::select(&config);
    let reasoning_loop = ReasoningLoop::new(&config, sandbox, registry, llm);

    let cancellation = CancellationToken::new();
    let cancel_on_signal = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    match reasoning_loop.run(session_id, &cli.query, mode, cancellation).await {
        Ok(outcome) => {
            println!("{}", outcome.response);
            println!(
                "--- session {} | {} iteration(s){} ---",
                outcome.session_id,
                outcome.iterations,
                if outcome.truncated { " | truncated" } else { "" }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
