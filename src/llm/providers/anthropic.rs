//! Anthropic Messages API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{error_from_response, http_client};
use crate::error::{ConfigError, LlmError};
use crate::llm::provider::{CompletionProvider, SamplingParams};

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Completion provider for the Anthropic `/messages` endpoint.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    sampling: SamplingParams,
}

impl AnthropicProvider {
    /// Creates a provider. `base_url` must not end with a slash.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        sampling: SamplingParams,
        timeout_secs: u64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            sampling,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.sampling.max_tokens,
            temperature: self.sampling.temperature,
            top_k: self.sampling.top_k,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn get_completion(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.base_url);

        let http_response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        if !http_response.status().is_success() {
            return Err(error_from_response(http_response).await);
        }

        let response: MessagesResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        joined_text(response.content)
    }
}

/// Joins the text blocks of a response. An empty text block is returned as
/// empty text; a response without any text block is a parse error.
fn joined_text(content: Vec<ContentBlock>) -> Result<String, LlmError> {
    let mut blocks = content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .peekable();

    if blocks.peek().is_none() {
        return Err(LlmError::ParseError(
            "Response contained no text content".to_string(),
        ));
    }
    Ok(blocks.collect())
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}
