//! OpenAI-compatible chat completions client.
//!
//! Serves the `openai`, `openrouter` and `vllm` backends, which differ only in
//! base URL, authentication and whether `top_k` is accepted.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{error_from_response, http_client};
use crate::error::{ConfigError, LlmError};
use crate::llm::provider::{CompletionProvider, ProviderKind, SamplingParams};

/// Completion provider speaking the `/chat/completions` protocol.
pub struct OpenAiCompatibleProvider {
    client: Client,
    kind: ProviderKind,
    base_url: String,
    api_key: Option<String>,
    model: String,
    sampling: SamplingParams,
}

impl OpenAiCompatibleProvider {
    /// Creates a provider. `base_url` must not end with a slash.
    pub fn new(
        kind: ProviderKind,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        sampling: SamplingParams,
        timeout_secs: u64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            kind,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            sampling,
        })
    }

    /// Backend this client talks to.
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: vec![ApiRequestMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.sampling.max_tokens,
            temperature: self.sampling.temperature,
            top_k: self.sampling.top_k.filter(|_| self.kind.supports_top_k()),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    async fn get_completion(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(prompt);

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        if self.kind == ProviderKind::OpenRouter {
            builder = builder
                .header("HTTP-Referer", "https://augment-forge.local")
                .header("X-Title", "augment-forge");
        }

        let http_response = builder
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !http_response.status().is_success() {
            return Err(error_from_response(http_response).await);
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        if let Some(usage) = &api_response.usage {
            tracing::debug!(
                provider = %self.kind,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ParseError("Response contained no message content".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiRequestMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApiRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
