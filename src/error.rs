//! Error types for augment-forge operations.
//!
//! Defines error types for each subsystem of the augmentation pipeline:
//! - Run configuration and provider selection
//! - Prompt template loading and rendering
//! - LLM completion requests
//! - Dataset loading
//! - JSONL output persistence
//! - Completion parsing (the only recoverable kind)

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving the run configuration.
///
/// All of these are fatal and surface before any record is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Must provide either a prompt config name or a prompt config path, but not both")]
    ConflictingPromptConfig,

    #[error("No prompt config given: provide a prompt config name or a prompt config path")]
    MissingPromptConfig,

    #[error("Unknown LLM provider '{0}' (supported: openai, openrouter, vllm, anthropic)")]
    UnknownProvider(String),

    #[error("Missing API key for provider '{provider}': pass --llm-api-key or set {env_var}")]
    MissingApiKey {
        provider: String,
        env_var: &'static str,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors that can occur during prompt template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Prompt config not found at '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse prompt config '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid template syntax in '{path}': {message}")]
    InvalidSyntax { path: String, message: String },

    #[error("Prompt config '{0}' has an empty template")]
    EmptyTemplate(String),

    #[error("Placeholder '{name}' has no value in the dataset record or user inputs")]
    MissingPlaceholder { name: String },

    #[error("Failed to render prompt: {0}")]
    RenderFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset '{0}' not found")]
    NotFound(String),

    #[error("Split '{split}' not found for dataset '{dataset}'")]
    SplitNotFound { dataset: String, split: String },

    #[error("Row {row} of '{source_name}' is not a JSON object")]
    InvalidRow { source_name: String, row: usize },

    #[error("Row {row} of '{dataset}' is truncated by the dataset server (cells: {})", cells.join(", "))]
    TruncatedRow {
        dataset: String,
        row: usize,
        cells: Vec<String>,
    },

    #[error("Dataset hub request failed: {0}")]
    RequestFailed(String),

    #[error("Dataset hub error ({code}): {message}")]
    HubError { code: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while writing augmented output.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create output directory '{}': {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to '{}': {source}", .path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A completion that could not be turned into an output record.
///
/// The runner recovers from this locally: the record is skipped and a
/// diagnostic is emitted.
#[derive(Debug, Error, PartialEq)]
pub enum OutputParseError {
    #[error("Invalid JSON at line {line}, column {column}: {message}")]
    InvalidJson {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Expected a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("Completion is empty")]
    Empty,
}

/// Fatal errors of an augmentation run.
#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to render prompt for record {record}: {source}")]
    Render {
        record: usize,
        #[source]
        source: TemplateError,
    },

    #[error("Completion request failed for record {record}: {source}")]
    Completion {
        record: usize,
        #[source]
        source: LlmError,
    },

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Output error: {0}")]
    Export(#[from] ExportError),
}

/// Result type alias for augmentation runs.
pub type Result<T> = std::result::Result<T, AugmentError>;
