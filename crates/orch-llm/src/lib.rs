//! LLM Client Abstraction (spec.md §4.G): a single `chat` operation behind
//! an anti-corruption layer, so the reasoning loop never speaks a vendor
//! dialect directly. Two dialects are implemented: Ollama's native
//! streaming-chat JSON and the OpenAI-compatible `/v1/chat/completions`
//! surface shared by LM Studio and friends.

pub mod ollama;
pub mod openai_compatible;
pub mod selector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use ollama::OllamaClient;
pub use openai_compatible::OpenAiCompatibleClient;
pub use selector::ClientSelector;

/// A single chat turn. `role` is `system`, `user`, or `assistant`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// Sampling controls common to both dialects; fields a dialect does not
/// support are silently dropped rather than rejected.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stop_sequences: Option<Vec<String>>,
    pub timeout: Option<std::time::Duration>,
}

/// Token accounting, when the backend reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One model entry as reported by a provider's model-listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("network error talking to the LLM backend: {0}")]
    Network(String),
    #[error("LLM backend returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("LLM call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("LLM backend response could not be decoded: {0}")]
    Decode(String),
    #[error("operation not supported by this backend")]
    Unsupported,
}

/// The only operation the reasoning loop needs on its hot path. Everything
/// else (`health_check`, `list_models`) is a secondary, optional surface.
#[async_trait]
pub trait Chat: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<(String, Option<TokenUsage>), LlmError>;

    async fn health_check(&self) -> Result<(), LlmError> {
        Err(LlmError::Unsupported)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        Err(LlmError::Unsupported)
    }
}

/// Runs `future` under `options.timeout` when one is set, mapping an
/// elapsed deadline onto [`LlmError::Timeout`]. Both dialect clients route
/// their HTTP round-trip through this so the per-call timeout behavior is
/// identical regardless of which wire format is in play.
pub(crate) async fn with_timeout<T>(
    options: &ChatOptions,
    future: impl std::future::Future<Output = Result<T, LlmError>>,
) -> Result<T, LlmError> {
    match options.timeout {
        Some(duration) => tokio::time::timeout(duration, future)
            .await
            .map_err(|_| LlmError::Timeout(duration))?,
        None => future.await,
    }
}
