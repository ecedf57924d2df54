//! The `/v1/chat/completions` dialect shared by OpenAI and
//! OpenAI-compatible local servers (LM Studio, vLLM, etc.).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{with_timeout, ChatOptions, LlmError, Message, ModelInfo, TokenUsage};

pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiCompatibleClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), api_key }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }
}

fn first_choice_text(response: ChatResponse) -> Result<(String, Option<TokenUsage>), LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Decode("response contained no choices".to_string()))?;
    let usage = response.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });
    Ok((choice.message.content, usage))
}

#[async_trait]
impl crate::Chat for OpenAiCompatibleClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<(String, Option<TokenUsage>), LlmError> {
        let request = ChatRequest {
            model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stop: options.stop_sequences.clone(),
        };

        with_timeout(options, async {
            let builder = self.client.post(self.url("/v1/chat/completions")).json(&request);
            let response = self
                .authorize(builder)
                .send()
                .await
                .map_err(|e| LlmError::Network(e.to_string()))?;

            let status = response.status();
            let body = response.text().await.map_err(|e| LlmError::Network(e.to_string()))?;
            if !status.is_success() {
                return Err(LlmError::Provider { status: status.as_u16(), body });
            }
            let parsed: ChatResponse =
                serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;
            first_choice_text(parsed)
        })
        .await
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        self.list_models().await.map(|_| ())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let builder = self.client.get(self.url("/v1/models"));
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Provider { status: status.as_u16(), body });
        }
        let parsed: ModelsResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;
        Ok(parsed.data.into_iter().map(|m| ModelInfo { name: m.id }).collect())
    }
}
