use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::ConfigError;

/// Which backend the orchestrator talks to by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    Ollama,
    Lmstudio,
}

impl ClientKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientKind::Ollama => "ollama",
            ClientKind::Lmstudio => "lmstudio",
        }
    }
}

/// One backend's connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BackendSettings {
    pub base_url: String,
    pub default_model: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Settings for the optional auxiliary language subprocess. The subprocess
/// itself is an external collaborator, out of scope here; only its
/// lifecycle knobs are.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SidecarSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_seconds: u64,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

fn default_startup_timeout() -> u64 {
    10
}

fn default_shutdown_timeout() -> u64 {
    5
}

/// Per-mode defaults for the reasoning loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StrategyDefaults {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for StrategyDefaults {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_max_iterations() -> u32 {
    8
}

/// Top-level orchestrator configuration, loaded from a single JSON file.
/// Unknown top-level keys are ignored rather than rejected, so old config
/// files keep working across additive schema changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub default_client: ClientKind,
    #[serde(default)]
    pub backends: HashMap<String, BackendSettings>,
    #[serde(default)]
    pub sidecar: SidecarSettings,
    #[serde(default)]
    pub strategy_defaults: StrategyDefaults,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(raw).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let key = self.default_client.as_str();
        if !self.backends.contains_key(key) {
            return Err(ConfigError::MissingBackend(key.to_string()));
        }
        Ok(())
    }

    pub fn default_backend(&self) -> &BackendSettings {
        self.backends
            .get(self.default_client.as_str())
            .expect("validate() guarantees the default backend exists")
    }
}

/// Walks upward from `start` looking for a repo-root marker (`Cargo.toml`
/// or `.git`); falls back to `start` itself if none is found, matching the
/// "on failure, the cwd is used" contract.
pub fn discover_repo_root(start: &Path) -> std::path::PathBuf {
    let mut dir = start;
    loop {
        if dir.join("Cargo.toml").exists() || dir.join(".git").exists() {
            return dir.to_path_buf();
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return start.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "DefaultClient": "ollama",
            "Backends": {
                "ollama": {"BaseUrl": "http://localhost:11434", "DefaultModel": "llama3"}
            }
        }"#
    }

    #[test]
    fn loads_minimal_config() {
        let cfg = Config::from_json_str(sample_json()).unwrap();
        assert_eq!(cfg.default_client.as_str(), "ollama");
        assert_eq!(cfg.strategy_defaults.max_iterations, 8);
    }

    #[test]
    fn rejects_missing_default_backend() {
        let raw = r#"{"DefaultClient": "lmstudio", "Backends": {}}"#;
        let err = Config::from_json_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBackend(ref k) if k == "lmstudio"));
    }

    #[test]
    fn ignores_unknown_top_level_keys() {
        let raw = r#"{
            "DefaultClient": "ollama",
            "Backends": {"ollama": {"BaseUrl": "http://x", "DefaultModel": "m"}},
            "some_future_key": {"whatever": true}
        }"#;
        assert!(Config::from_json_str(raw).is_ok());
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = Config::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn discover_repo_root_finds_cargo_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[workspace]").unwrap();
        let nested = dir.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(discover_repo_root(&nested), dir.path());
    }

    #[test]
    fn discover_repo_root_falls_back_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("no/markers/here");
        std::fs::create_dir_all(&nested).unwrap();
        let root = discover_repo_root(&nested);
        assert!(root == nested || root.join("Cargo.toml").exists() || root.join(".git").exists());
    }
}
