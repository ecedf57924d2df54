//! Loads and validates the single JSON configuration file: `DefaultClient`,
//! per-backend connection settings, the sidecar subprocess block, and
//! reasoning-loop strategy defaults.

pub mod config;

pub use config::{
    discover_repo_root, BackendSettings, ClientKind, Config, SidecarSettings, StrategyDefaults,
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    Io(String, String),

    #[error("malformed config: {0}")]
    Malformed(String),

    #[error("DefaultClient names backend '{0}' but no matching entry exists in backends")]
    MissingBackend(String),
}

impl From<ConfigError> for orch_core::OrchestratorError {
    fn from(err: ConfigError) -> Self {
        orch_core::OrchestratorError::Configuration(err.to_string())
    }
}
