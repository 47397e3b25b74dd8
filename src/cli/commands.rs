//! CLI command definitions for augment-forge.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::dataset::{AutoDatasetSource, HubDatasetSource};
use crate::error::ConfigError;
use crate::export::DEFAULT_OUTPUT_DIR;
use crate::llm::{LlmConfig, ProviderKind, SamplingParams, DEFAULT_TIMEOUT_SECS};
use crate::pipeline::{
    default_user_inputs, AugmentationRunner, ParseMode, RunConfig, SampleSelection,
    TracingDiagnostics, DEFAULT_CONFIG_DIR, DEFAULT_DATASET_NAME, DEFAULT_DATASET_SPLIT,
    DEFAULT_MODEL, DEFAULT_PROMPT_NAME,
};
use crate::template::{PromptSelection, PromptTemplate};

/// Batch dataset augmentation with LLMs.
#[derive(Parser)]
#[command(name = "augment-forge")]
#[command(about = "Augment datasets by prompting an LLM with each row and keeping the JSON it returns")]
#[command(version)]
#[command(
    long_about = "augment-forge renders every selected dataset row into a prompt, sends it to an LLM and appends each JSON object it returns to a JSONL file.\n\nExample usage:\n  augment-forge augment --config-name question_and_answer --dataset-name ContextualAI/tiny-wiki100-chunks -n 10"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run an augmentation: render, complete, parse and append every selected row.
    #[command(alias = "run")]
    Augment(AugmentArgs),

    /// Print the rendered prompts for the first selected rows without calling an LLM.
    Render(RenderArgs),

    /// List the supported LLM providers.
    Providers,
}

/// Prompt config selection and template overrides.
#[derive(clap::Args, Debug, Clone)]
pub struct PromptArgs {
    /// Prompt config name, resolved to `<config-dir>/prompts/<name>.yaml`.
    /// Defaults to `question_and_answer` when no path is given.
    #[arg(long)]
    pub config_name: Option<String>,

    /// Explicit path to a prompt config file.
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Directory containing the `prompts/` folder.
    #[arg(long, default_value = DEFAULT_CONFIG_DIR, env = "AUGMENT_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Template override as KEY=VALUE (repeatable). Replaces the default
    /// `user_supplied_suffix` when given.
    #[arg(long = "user-input", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub user_inputs: Vec<(String, String)>,
}

impl PromptArgs {
    /// Name and path as passed to the core, substituting the default name when
    /// neither was given.
    fn selection_parts(&self) -> (Option<String>, Option<PathBuf>) {
        match (&self.config_name, &self.config_path) {
            (None, None) => (Some(DEFAULT_PROMPT_NAME.to_string()), None),
            (name, path) => (name.clone(), path.clone()),
        }
    }

    fn user_input_map(&self) -> BTreeMap<String, String> {
        self.user_inputs.iter().cloned().collect()
    }
}

/// Dataset and sample selection.
#[derive(clap::Args, Debug, Clone)]
pub struct DatasetArgs {
    /// Hugging Face dataset name, or a path to a local .jsonl/.json file or directory.
    #[arg(long, default_value = DEFAULT_DATASET_NAME)]
    pub dataset_name: String,

    /// Dataset split to read.
    #[arg(long, default_value = DEFAULT_DATASET_SPLIT)]
    pub dataset_split: String,

    /// Hub dataset config (subset).
    #[arg(long)]
    pub dataset_config: Option<String>,

    /// Hugging Face token for gated or private datasets.
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Number of rows to process.
    #[arg(short = 'n', long, default_value = "100")]
    pub n_samples: usize,

    /// Shuffle rows before selecting.
    #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
    pub shuffle: bool,

    /// Shuffle seed.
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

impl DatasetArgs {
    fn source(&self) -> anyhow::Result<AutoDatasetSource> {
        let mut hub = HubDatasetSource::new(self.hf_token.clone())
            .context("Failed to initialize dataset hub client")?;
        if let Some(config) = &self.dataset_config {
            hub = hub.with_config(config.clone());
        }
        Ok(AutoDatasetSource::with_hub(hub))
    }

    fn selection(&self) -> SampleSelection {
        SampleSelection {
            dataset_name: self.dataset_name.clone(),
            split: self.dataset_split.clone(),
            shuffle: self.shuffle,
            seed: self.seed,
            n_samples: self.n_samples,
        }
    }
}

/// LLM backend settings.
#[derive(clap::Args, Debug, Clone)]
pub struct LlmArgs {
    /// LLM provider (openai, openrouter, vllm, anthropic).
    #[arg(long, default_value = "openai", value_parser = parse_provider)]
    pub llm_provider: ProviderKind,

    /// Model identifier.
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub llm_model: String,

    /// Maximum tokens per completion.
    #[arg(long, default_value = "32")]
    pub llm_max_tokens: u32,

    /// Sampling temperature.
    #[arg(long, default_value = "0.1")]
    pub llm_temperature: f64,

    /// Top-k sampling (ignored by providers that do not support it).
    #[arg(long, default_value = "100")]
    pub llm_top_k: u32,

    /// Base URL override, e.g. a self-hosted vLLM server.
    #[arg(long)]
    pub llm_server_base: Option<String>,

    /// API key. Falls back to the provider's environment variable.
    #[arg(long)]
    pub llm_api_key: Option<String>,

    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub llm_timeout_secs: u64,
}

impl LlmArgs {
    fn to_config(&self) -> LlmConfig {
        LlmConfig {
            provider: self.llm_provider,
            model: self.llm_model.clone(),
            sampling: SamplingParams {
                max_tokens: self.llm_max_tokens,
                temperature: self.llm_temperature,
                top_k: Some(self.llm_top_k),
            },
            server_base: self.llm_server_base.clone(),
            api_key: self.llm_api_key.clone(),
            timeout_secs: self.llm_timeout_secs,
        }
    }
}

/// Arguments for `augment-forge augment`.
#[derive(clap::Args, Debug)]
pub struct AugmentArgs {
    #[command(flatten)]
    pub prompt: PromptArgs,

    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub llm: LlmArgs,

    /// Output directory; relative paths are resolved against the working directory.
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Output file name. Derived from the prompt config and dataset names when omitted.
    #[arg(long)]
    pub output_name: Option<String>,

    /// Also accept JSON wrapped in code fences or surrounded by prose.
    #[arg(long)]
    pub extract_json: bool,
}

impl AugmentArgs {
    /// Builds the run configuration described by these arguments.
    pub fn to_run_config(&self) -> RunConfig {
        let (prompt_name, prompt_path) = self.prompt.selection_parts();
        RunConfig {
            output_dir: self.output_dir.clone(),
            output_name: self.output_name.clone(),
            shuffle: self.dataset.shuffle,
            seed: self.dataset.seed,
            n_samples: self.dataset.n_samples,
            llm: self.llm.to_config(),
            dataset_name: self.dataset.dataset_name.clone(),
            dataset_split: self.dataset.dataset_split.clone(),
            prompt_name,
            prompt_path,
            config_dir: self.prompt.config_dir.clone(),
            user_inputs: self.prompt.user_input_map(),
            parse_mode: if self.extract_json {
                ParseMode::Extract
            } else {
                ParseMode::Strict
            },
        }
    }
}

/// Arguments for `augment-forge render`.
#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub prompt: PromptArgs,

    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Number of prompts to print.
    #[arg(long, default_value = "1")]
    pub limit: usize,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_provider(s: &str) -> Result<ProviderKind, ConfigError> {
    s.parse()
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Augment(args) => run_augment_command(args).await,
        Commands::Render(args) => run_render_command(args).await,
        Commands::Providers => {
            run_providers_command();
            Ok(())
        }
    }
}

async fn run_augment_command(args: AugmentArgs) -> anyhow::Result<()> {
    let config = args.to_run_config();
    let runner = AugmentationRunner::from_config(&config, Arc::new(TracingDiagnostics))
        .await
        .context("Failed to set up augmentation run")?;

    let source = args.dataset.source()?;
    let start = std::time::Instant::now();
    let progress = runner
        .run(&source)
        .await
        .with_context(|| format!("Augmentation of '{}' failed", config.dataset_name))?;

    info!(
        duration_secs = start.elapsed().as_secs_f64(),
        "Augmentation command finished"
    );
    println!("✓ Augmentation completed");
    println!("  Output file: {}", runner.output_path().display());
    println!(
        "  Records:     {} written, {} skipped of {}",
        progress.written, progress.skipped, progress.total
    );
    Ok(())
}

async fn run_render_command(args: RenderArgs) -> anyhow::Result<()> {
    let (name, path) = args.prompt.selection_parts();
    let selection = PromptSelection::from_parts(name, path)?;
    let template = PromptTemplate::load(&selection, &args.prompt.config_dir)
        .with_context(|| format!("Failed to load prompt config '{}'", selection.config_name()))?;

    let user_inputs = {
        let supplied = args.prompt.user_input_map();
        if supplied.is_empty() {
            default_user_inputs()
        } else {
            supplied
        }
    };

    let source = args.dataset.source()?;
    let dataset = args.dataset.selection().load(&source).await?;

    for (index, record) in dataset.iter().take(args.limit).enumerate() {
        let prompt = template
            .render(record, &user_inputs)
            .with_context(|| format!("Failed to render record {}", index))?;
        println!("=== record {} ===", index);
        println!("{}", prompt);
    }
    Ok(())
}

fn run_providers_command() {
    for kind in ProviderKind::ALL {
        let key = if kind.requires_api_key() {
            kind.api_key_env().to_string()
        } else {
            format!("{} (optional)", kind.api_key_env())
        };
        println!(
            "{:<12} {:<32} {}",
            kind.as_str(),
            kind.default_base_url(),
            key
        );
    }
}
