use clap::Parser;

/// Runs one query through the reasoning loop and prints the final response.
#[derive(Parser)]
#[command(name = "orchestrator", version, about = "LLM reasoning loop with sandboxed tool dispatch")]
pub struct Cli {
    /// The task to hand to the model.
    pub query: String,

    /// Reasoning mode: single, collaborative, or intelligent (case-insensitive).
    #[arg(default_value = "single")]
    pub mode: String,

    /// Path to the JSON configuration file.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Resume an existing session id instead of starting a fresh one.
    #[arg(long)]
    pub session: Option<String>,
}
