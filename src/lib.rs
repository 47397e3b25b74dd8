//! augment-forge: batch dataset augmentation with LLMs.
//!
//! Every selected dataset row is rendered into a prompt, sent to an LLM, and
//! the JSON object it returns is appended to a JSONL file. Completions that do
//! not parse are skipped without stopping the run.

pub mod cli;
pub mod dataset;
pub mod error;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use dataset::{Dataset, DatasetRecord, DatasetSource};
pub use error::{
    AugmentError, ConfigError, DatasetError, ExportError, LlmError, OutputParseError,
    TemplateError,
};
pub use export::{JsonlWriter, OutputRecord, OutputSink};
pub use llm::{build_provider, CompletionProvider, LlmConfig, ProviderKind};
pub use pipeline::{AugmentationRunner, Diagnostics, RunConfig, RunProgress};
pub use template::{PromptSelection, PromptTemplate};
