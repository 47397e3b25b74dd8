//! Run configuration for an augmentation run.
//!
//! A [`RunConfig`] is built once from caller arguments and never mutated
//! afterwards. Defaults match the command line defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::export::DEFAULT_OUTPUT_DIR;
use crate::llm::{LlmConfig, ProviderKind};
use crate::pipeline::parse::ParseMode;
use crate::template::PromptSelection;

/// Seed used for shuffling when none is given.
pub const DEFAULT_SHUFFLE_SEED: u64 = 42;

/// Number of records processed when none is given.
pub const DEFAULT_N_SAMPLES: usize = 100;

/// Prompt config used by the command line when neither name nor path is given.
pub const DEFAULT_PROMPT_NAME: &str = "question_and_answer";

/// Dataset read when none is given.
pub const DEFAULT_DATASET_NAME: &str = "ContextualAI/tiny-wiki100-chunks";

/// Dataset split read when none is given.
pub const DEFAULT_DATASET_SPLIT: &str = "train";

/// Default LLM model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Directory searched for `prompts/<name>.yaml`.
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Key of the default user input.
pub const USER_SUPPLIED_SUFFIX_KEY: &str = "user_supplied_suffix";

/// Value of the default user input.
pub const DEFAULT_USER_SUPPLIED_SUFFIX: &str =
    "_Note_ - Ensure all question and answer pairs are implied by the context above.";

/// User inputs applied when the caller supplies none.
pub fn default_user_inputs() -> BTreeMap<String, String> {
    BTreeMap::from([(
        USER_SUPPLIED_SUFFIX_KEY.to_string(),
        DEFAULT_USER_SUPPLIED_SUFFIX.to_string(),
    )])
}

/// Parameters of one augmentation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Directory the output file is written to. Relative paths are resolved
    /// against the working directory.
    pub output_dir: PathBuf,
    /// Output file name; derived from the prompt and dataset names when unset.
    pub output_name: Option<String>,
    /// Shuffle records before truncating.
    pub shuffle: bool,
    /// Seed for the shuffle.
    pub seed: u64,
    /// Maximum number of records to process.
    pub n_samples: usize,
    /// LLM backend settings.
    pub llm: LlmConfig,
    /// Dataset identifier: hub name or local path.
    pub dataset_name: String,
    /// Split to read.
    pub dataset_split: String,
    /// Symbolic prompt config name. Mutually exclusive with `prompt_path`.
    pub prompt_name: Option<String>,
    /// Explicit prompt config path. Mutually exclusive with `prompt_name`.
    pub prompt_path: Option<PathBuf>,
    /// Directory symbolic prompt names are resolved against.
    pub config_dir: PathBuf,
    /// Template overrides. Empty means the defaults apply.
    pub user_inputs: BTreeMap<String, String>,
    /// How completions are turned into records.
    pub parse_mode: ParseMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_name: None,
            shuffle: true,
            seed: DEFAULT_SHUFFLE_SEED,
            n_samples: DEFAULT_N_SAMPLES,
            llm: LlmConfig::new(ProviderKind::OpenAi, DEFAULT_MODEL),
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            dataset_split: DEFAULT_DATASET_SPLIT.to_string(),
            prompt_name: None,
            prompt_path: None,
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            user_inputs: BTreeMap::new(),
            parse_mode: ParseMode::default(),
        }
    }
}

impl RunConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// The prompt selection, enforcing that exactly one of name and path is set.
    pub fn prompt_selection(&self) -> Result<PromptSelection, ConfigError> {
        PromptSelection::from_parts(self.prompt_name.clone(), self.prompt_path.clone())
    }

    /// Overrides used when rendering: the configured ones, or the defaults
    /// when none were supplied.
    pub fn effective_user_inputs(&self) -> BTreeMap<String, String> {
        if self.user_inputs.is_empty() {
            default_user_inputs()
        } else {
            self.user_inputs.clone()
        }
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for conflicting or missing prompt configs and
    /// for invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.prompt_selection()?;

        if self.dataset_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "dataset_name".to_string(),
                message: "cannot be empty".to_string(),
            });
        }

        if self.dataset_split.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "dataset_split".to_string(),
                message: "cannot be empty".to_string(),
            });
        }

        if let Some(name) = &self.output_name {
            if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
                return Err(ConfigError::InvalidValue {
                    key: "output_name".to_string(),
                    message: format!("'{}' is not a plain file name", name),
                });
            }
        }

        self.llm.validate()
    }

    /// Builder method to set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method to set the output file name.
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Builder method to enable or disable shuffling.
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Builder method to set the shuffle seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the sample count.
    pub fn with_n_samples(mut self, n: usize) -> Self {
        self.n_samples = n;
        self
    }

    /// Builder method to set the LLM settings.
    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }

    /// Builder method to set the dataset name and split.
    pub fn with_dataset(mut self, name: impl Into<String>, split: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self.dataset_split = split.into();
        self
    }

    /// Builder method to select a prompt config by name.
    pub fn with_prompt_name(mut self, name: impl Into<String>) -> Self {
        self.prompt_name = Some(name.into());
        self
    }

    /// Builder method to select a prompt config by path.
    pub fn with_prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prompt_path = Some(path.into());
        self
    }

    /// Builder method to set the prompt config directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// Builder method to add a template override.
    pub fn with_user_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_inputs.insert(key.into(), value.into());
        self
    }

    /// Builder method to set the parse mode.
    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }
}
