//! Ollama's native `/api/chat` dialect: requests always set `stream:
//! true`, and the body comes back as newline-delimited JSON objects, each
//! carrying one fragment of the assistant message; the fragments are
//! concatenated into the final text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{with_timeout, ChatOptions, LlmError, Message, ModelInfo, TokenUsage};

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<OllamaChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaTagEntry>,
}

#[derive(Deserialize)]
struct OllamaTagEntry {
    name: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// Concatenates the `message.content` of every newline-delimited JSON
/// chunk into one string, and sums token counts from the final chunk
/// (Ollama only reports them once `done` is true).
fn accumulate(body: &str) -> Result<(String, Option<TokenUsage>), LlmError> {
    let mut text = String::new();
    let mut usage = None;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let chunk: OllamaChatChunk =
            serde_json::from_str(line).map_err(|e| LlmError::Decode(e.to_string()))?;
        if let Some(message) = chunk.message {
            text.push_str(&message.content);
        }
        if chunk.done {
            usage = Some(TokenUsage {
                prompt_tokens: chunk.prompt_eval_count.unwrap_or(0),
                completion_tokens: chunk.eval_count.unwrap_or(0),
                total_tokens: chunk.prompt_eval_count.unwrap_or(0) + chunk.eval_count.unwrap_or(0),
            });
        }
    }

    if text.is_empty() && usage.is_none() {
        return Err(LlmError::Decode("no chat chunks in response body".to_string()));
    }
    Ok((text, usage))
}

#[async_trait]
impl crate::Chat for OllamaClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<(String, Option<TokenUsage>), LlmError> {
        let request = OllamaChatRequest {
            model,
            messages,
            stream: true,
            options: Some(OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens.map(i64::from),
                stop: options.stop_sequences.clone(),
            }),
        };

        with_timeout(options, async {
            let response = self
                .client
                .post(self.url("/api/chat"))
                .json(&request)
                .send()
                .await
                .map_err(|e| LlmError::Network(e.to_string()))?;

            let status = response.status();
            let body = response.text().await.map_err(|e| LlmError::Network(e.to_string()))?;
            if !status.is_success() {
                return Err(LlmError::Provider { status: status.as_u16(), body });
            }
            accumulate(&body)
        })
        .await
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(LlmError::Provider { status: response.status().as_u16(), body: String::new() })
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Provider { status: status.as_u16(), body });
        }
        let parsed: OllamaTagsResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;
        Ok(parsed.models.into_iter().map(|m| ModelInfo { name: m.name }).collect())
    }
}
