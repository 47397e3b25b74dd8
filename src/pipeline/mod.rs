//! The augmentation pipeline.
//!
//! # Pipeline Flow
//!
//! 1. **Resolve**: validate the [`RunConfig`], load the prompt template, build
//!    the completion provider, compute the output path
//! 2. **Load**: fetch the dataset split, shuffle with a fixed seed, truncate
//! 3. **Process**: for each record render, complete, parse, append
//! 4. **Finish**: report [`RunProgress`] through [`Diagnostics`]
//!
//! Completions that do not parse as a JSON object are skipped with one
//! diagnostic each. Every other error aborts the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use augment_forge::dataset::AutoDatasetSource;
//! use augment_forge::pipeline::{AugmentationRunner, RunConfig, TracingDiagnostics};
//!
//! let config = RunConfig::new()
//!     .with_prompt_name("question_and_answer")
//!     .with_n_samples(10);
//! let runner = AugmentationRunner::from_config(&config, Arc::new(TracingDiagnostics)).await?;
//! let progress = runner.run(&AutoDatasetSource::new(None)?).await?;
//! println!("wrote {} records", progress.written);
//! ```

pub mod config;
pub mod diagnostics;
pub mod parse;
pub mod runner;

pub use config::{
    default_user_inputs, RunConfig, DEFAULT_CONFIG_DIR, DEFAULT_DATASET_NAME,
    DEFAULT_DATASET_SPLIT, DEFAULT_MODEL, DEFAULT_N_SAMPLES, DEFAULT_PROMPT_NAME,
    DEFAULT_SHUFFLE_SEED, DEFAULT_USER_SUPPLIED_SUFFIX, USER_SUPPLIED_SUFFIX_KEY,
};
pub use diagnostics::{Diagnostics, RunProgress, TracingDiagnostics};
pub use parse::{parse_completion, ParseMode};
pub use runner::{AugmentationRunner, RunnerParts, SampleSelection};
