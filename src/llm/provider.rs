//! Completion provider abstraction and backend selection.
//!
//! Backends form a closed set ([`ProviderKind`]). A provider is chosen once,
//! when the run starts, from an [`LlmConfig`]; afterwards the pipeline only
//! sees the [`CompletionProvider`] capability.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use super::providers::{AnthropicProvider, OpenAiCompatibleProvider};
use crate::error::{ConfigError, LlmError};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Something that turns a prompt into a completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the raw completion text for `prompt`.
    async fn get_completion(&self, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for Arc<T> {
    async fn get_completion(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).get_completion(prompt).await
    }
}

#[async_trait]
impl<T: CompletionProvider + ?Sized> CompletionProvider for Box<T> {
    async fn get_completion(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).get_completion(prompt).await
    }
}

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenAI chat completions API.
    OpenAi,
    /// OpenRouter aggregator (OpenAI-compatible).
    OpenRouter,
    /// Self-hosted vLLM server (OpenAI-compatible chat completions).
    Vllm,
    /// Anthropic Messages API.
    Anthropic,
}

impl ProviderKind {
    /// Every supported provider, in display order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::OpenRouter,
        ProviderKind::Vllm,
        ProviderKind::Anthropic,
    ];

    /// Identifier accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Vllm => "vllm",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Base URL used when no server override is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Vllm => "http://localhost:8000/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::Vllm => "VLLM_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Whether requests are rejected without an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Vllm)
    }

    /// Whether the backend accepts a `top_k` sampling parameter.
    pub fn supports_top_k(&self) -> bool {
        !matches!(self, ProviderKind::OpenAi)
    }

    /// Highest sampling temperature the backend accepts.
    pub fn max_temperature(&self) -> f64 {
        match self {
            ProviderKind::Anthropic => 1.0,
            _ => 2.0,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "vllm" => Ok(ProviderKind::Vllm),
            "anthropic" => Ok(ProviderKind::Anthropic),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Top-k sampling; dropped for backends that do not accept it.
    pub top_k: Option<u32>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: 32,
            temperature: 0.1,
            top_k: Some(100),
        }
    }
}

/// Everything needed to construct a completion provider.
#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    /// Backend to use.
    pub provider: ProviderKind,
    /// Model identifier passed to the backend.
    pub model: String,
    /// Sampling parameters.
    pub sampling: SamplingParams,
    /// Overrides the backend base URL, e.g. to route to a self-hosted server.
    pub server_base: Option<String>,
    /// API key; read from the provider's environment variable when unset.
    pub api_key: Option<String>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("sampling", &self.sampling)
            .field("server_base", &self.server_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    /// Creates a configuration with default sampling and no overrides.
    pub fn new(provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            sampling: SamplingParams::default(),
            server_base: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the sampling parameters.
    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Set the server base override.
    pub fn with_server_base(mut self, server_base: impl Into<String>) -> Self {
        self.server_base = Some(server_base.into());
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> String {
        self.server_base
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Resolves the API key from the config or the provider's environment
    /// variable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingApiKey` if the provider requires a key and
    /// none is available.
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        let non_blank = |k: &String| !k.trim().is_empty();
        let key = self
            .api_key
            .clone()
            .filter(non_blank)
            .or_else(|| env::var(self.provider.api_key_env()).ok().filter(non_blank));

        if key.is_none() && self.provider.requires_api_key() {
            return Err(ConfigError::MissingApiKey {
                provider: self.provider.to_string(),
                env_var: self.provider.api_key_env(),
            });
        }
        Ok(key)
    }

    /// Validates the configuration without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "llm_model".to_string(),
                message: "Model name cannot be empty".to_string(),
            });
        }
        if self.sampling.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm_max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }
        let max_temperature = self.provider.max_temperature();
        if !(0.0..=max_temperature).contains(&self.sampling.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "llm_temperature".to_string(),
                message: format!(
                    "Must be between 0.0 and {:.1} for {}, got {}",
                    max_temperature, self.provider, self.sampling.temperature
                ),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm_timeout_secs".to_string(),
                message: "Must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}

/// Builds the completion provider described by `config`.
///
/// # Errors
///
/// Returns a `ConfigError` for invalid settings or a missing API key.
pub fn build_provider(config: &LlmConfig) -> Result<Arc<dyn CompletionProvider>, ConfigError> {
    config.validate()?;
    let api_key = config.resolve_api_key()?;
    let base_url = config.base_url();

    tracing::info!(
        provider = %config.provider,
        model = %config.model,
        base_url = %base_url,
        "Using LLM provider"
    );

    let provider: Arc<dyn CompletionProvider> = match config.provider {
        ProviderKind::OpenAi | ProviderKind::OpenRouter | ProviderKind::Vllm => {
            Arc::new(OpenAiCompatibleProvider::new(
                config.provider,
                base_url,
                api_key,
                config.model.clone(),
                config.sampling.clone(),
                config.timeout_secs,
            )?)
        }
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            base_url,
            api_key.unwrap_or_default(),
            config.model.clone(),
            config.sampling.clone(),
            config.timeout_secs,
        )?),
    };
    Ok(provider)
}
