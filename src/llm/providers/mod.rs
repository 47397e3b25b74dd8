//! HTTP clients for the supported completion backends.

pub mod anthropic;
pub mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatibleProvider;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{ConfigError, LlmError};

/// Builds the HTTP client shared by every request of one provider.
pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Maps a non-2xx response to an `LlmError`.
///
/// Structured error bodies (`{"error": {"message": ...}}`) are unwrapped;
/// anything else is passed through as text.
pub(crate) async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status_code = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());

    let message = match serde_json::from_str::<ApiErrorResponse>(&error_text) {
        Ok(parsed) => parsed.error.message,
        Err(_) => error_text,
    };

    if status_code == 429 {
        return LlmError::RateLimited(message);
    }
    LlmError::ApiError {
        code: status_code,
        message,
    }
}

/// Error response envelope shared by OpenAI-style and Anthropic APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
