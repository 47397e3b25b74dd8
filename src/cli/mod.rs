//! Command-line interface for augment-forge.
//!
//! Provides commands for running an augmentation, previewing rendered
//! prompts, and listing the supported LLM providers.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
