//! The augmentation loop.
//!
//! [`AugmentationRunner::from_config`] resolves everything that can fail
//! before any record is touched: prompt selection, template, provider and
//! output location. [`AugmentationRunner::run`] then loads the dataset and
//! processes the selected records one at a time.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::config::RunConfig;
use super::diagnostics::{Diagnostics, RunProgress};
use super::parse::{parse_completion, ParseMode};
use crate::dataset::{Dataset, DatasetSource};
use crate::error::{AugmentError, Result};
use crate::export::{
    derive_output_name, ensure_directory_exists, output_path, JsonlWriter, OutputSink,
};
use crate::llm::{build_provider, CompletionProvider};
use crate::template::PromptTemplate;

/// Which records of a dataset a run processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSelection {
    /// Dataset identifier.
    pub dataset_name: String,
    /// Split to read.
    pub split: String,
    /// Shuffle before truncating.
    pub shuffle: bool,
    /// Shuffle seed.
    pub seed: u64,
    /// Upper bound on the number of records.
    pub n_samples: usize,
}

impl SampleSelection {
    /// Selection described by a run configuration.
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            dataset_name: config.dataset_name.clone(),
            split: config.dataset_split.clone(),
            shuffle: config.shuffle,
            seed: config.seed,
            n_samples: config.n_samples,
        }
    }

    /// Applies the shuffle and truncation to an already loaded dataset.
    ///
    /// The result holds `min(n_samples, dataset.len())` records.
    pub fn apply(&self, dataset: Dataset) -> Dataset {
        let dataset = if self.shuffle {
            dataset.shuffle(self.seed)
        } else {
            dataset
        };
        let count = self.n_samples.min(dataset.len());
        dataset.select(0..count)
    }

    /// Loads the split from `source` and applies the selection.
    pub async fn load(&self, source: &dyn DatasetSource) -> Result<Dataset> {
        let dataset = source.load(&self.dataset_name, &self.split).await?;
        tracing::debug!(
            dataset = %self.dataset_name,
            split = %self.split,
            rows = dataset.len(),
            "Loaded dataset"
        );
        Ok(self.apply(dataset))
    }
}

/// Collaborators of a runner, for callers that build them directly.
pub struct RunnerParts {
    pub template: PromptTemplate,
    pub provider: Arc<dyn CompletionProvider>,
    pub sink: Arc<dyn OutputSink>,
    pub diagnostics: Arc<dyn Diagnostics>,
    pub selection: SampleSelection,
    pub user_inputs: BTreeMap<String, String>,
    pub parse_mode: ParseMode,
    pub output_path: PathBuf,
}

/// Renders, completes, parses and persists dataset records.
pub struct AugmentationRunner {
    template: PromptTemplate,
    provider: Arc<dyn CompletionProvider>,
    sink: Arc<dyn OutputSink>,
    diagnostics: Arc<dyn Diagnostics>,
    selection: SampleSelection,
    user_inputs: BTreeMap<String, String>,
    parse_mode: ParseMode,
    output_path: PathBuf,
}

impl AugmentationRunner {
    /// Assembles a runner from prebuilt parts.
    pub fn new(parts: RunnerParts) -> Self {
        Self {
            template: parts.template,
            provider: parts.provider,
            sink: parts.sink,
            diagnostics: parts.diagnostics,
            selection: parts.selection,
            user_inputs: parts.user_inputs,
            parse_mode: parts.parse_mode,
            output_path: parts.output_path,
        }
    }

    /// Resolves a run configuration into a runner.
    ///
    /// Builds the completion provider from `config.llm`. Does not access the
    /// dataset.
    ///
    /// # Errors
    ///
    /// Fails on conflicting or missing prompt configs, template errors,
    /// provider configuration errors and when the output directory cannot be
    /// created.
    pub async fn from_config(config: &RunConfig, diagnostics: Arc<dyn Diagnostics>) -> Result<Self> {
        config.validate()?;
        let provider = build_provider(&config.llm)?;
        Self::from_config_with_provider(config, provider, diagnostics).await
    }

    /// Like [`AugmentationRunner::from_config`], with a caller-supplied
    /// completion provider.
    pub async fn from_config_with_provider(
        config: &RunConfig,
        provider: Arc<dyn CompletionProvider>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Result<Self> {
        config.validate()?;
        let prompt = config.prompt_selection()?;
        let template = PromptTemplate::load(&prompt, &config.config_dir)?;

        let file_name = match &config.output_name {
            Some(name) => name.clone(),
            None => derive_output_name(&prompt.config_name(), &config.dataset_name),
        };
        let output_path = output_path(&config.output_dir, &file_name)?;
        if let Some(parent) = output_path.parent() {
            ensure_directory_exists(parent).await?;
        }

        tracing::info!(
            prompt = %template.name(),
            output = %output_path.display(),
            "Resolved augmentation run"
        );

        Ok(Self::new(RunnerParts {
            template,
            provider,
            sink: Arc::new(JsonlWriter::new(output_path.clone())),
            diagnostics,
            selection: SampleSelection::from_config(config),
            user_inputs: config.effective_user_inputs(),
            parse_mode: config.parse_mode,
            output_path,
        }))
    }

    /// File records are appended to.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// The resolved prompt template.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Loads the selected records from `source` and processes them in order.
    ///
    /// Unparseable completions are reported through [`Diagnostics`] and
    /// skipped. Any other failure aborts the run; records written before it
    /// stay on disk.
    pub async fn run(&self, source: &dyn DatasetSource) -> Result<RunProgress> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("augment", run_id = %run_id);
        self.run_inner(source).instrument(span).await
    }

    async fn run_inner(&self, source: &dyn DatasetSource) -> Result<RunProgress> {
        let dataset = self.selection.load(source).await?;
        let mut progress = RunProgress::new(dataset.len());
        self.diagnostics.run_started(progress.total, &self.output_path);

        for (index, record) in dataset.iter().enumerate() {
            let prompt = self
                .template
                .render(record, &self.user_inputs)
                .map_err(|source| AugmentError::Render {
                    record: index,
                    source,
                })?;

            let completion = self
                .provider
                .get_completion(&prompt)
                .await
                .map_err(|source| AugmentError::Completion {
                    record: index,
                    source,
                })?;

            match parse_completion(&completion, self.parse_mode) {
                Ok(output) => {
                    self.sink.write(&output).await?;
                    progress.record_written();
                    self.diagnostics.record_written(index, &progress);
                }
                Err(error) => {
                    progress.record_skipped();
                    self.diagnostics.parse_failed(index, &completion, &error);
                }
            }
        }

        self.diagnostics.run_finished(&progress);
        Ok(progress)
    }
}

impl std::fmt::Debug for AugmentationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AugmentationRunner")
            .field("template", &self.template)
            .field("selection", &self.selection)
            .field("parse_mode", &self.parse_mode)
            .field("output_path", &self.output_path)
            .finish_non_exhaustive()
    }
}
