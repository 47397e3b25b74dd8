//! LLM integration for augment-forge.
//!
//! The pipeline talks to a model exclusively through [`CompletionProvider`].
//! Concrete backends live in [`providers`] and are picked by [`build_provider`]
//! from an [`LlmConfig`]:
//!
//! ```ignore
//! use augment_forge::llm::{build_provider, LlmConfig, ProviderKind};
//!
//! let config = LlmConfig::new(ProviderKind::Vllm, "mistralai/Mistral-7B-Instruct-v0.2")
//!     .with_server_base("http://localhost:8000/v1");
//! let provider = build_provider(&config)?;
//! let completion = provider.get_completion("Say hi").await?;
//! ```

pub mod provider;
pub mod providers;

pub use provider::{
    build_provider, CompletionProvider, LlmConfig, ProviderKind, SamplingParams,
    DEFAULT_TIMEOUT_SECS,
};
pub use providers::{AnthropicProvider, OpenAiCompatibleProvider};
