//! Run progress reporting.
//!
//! The runner never logs directly; it reports through a [`Diagnostics`]
//! implementation handed to it at construction.

use std::path::Path;

use crate::error::OutputParseError;

/// Counters describing how far a run has progressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunProgress {
    /// Records selected for the run.
    pub total: usize,
    /// Records that went through render and completion.
    pub processed: usize,
    /// Records persisted to the output file.
    pub written: usize,
    /// Records whose completion could not be parsed.
    pub skipped: usize,
}

impl RunProgress {
    /// Creates counters for a run over `total` records.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Records one persisted record.
    pub fn record_written(&mut self) {
        self.processed += 1;
        self.written += 1;
    }

    /// Records one skipped record.
    pub fn record_skipped(&mut self) {
        self.processed += 1;
        self.skipped += 1;
    }

    /// Records not yet processed.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }
}

/// Receives progress events from a run.
pub trait Diagnostics: Send + Sync {
    /// The dataset has been loaded and `total` records were selected.
    fn run_started(&self, _total: usize, _output: &Path) {}

    /// Record `index` was written.
    fn record_written(&self, _index: usize, _progress: &RunProgress) {}

    /// The completion for record `index` could not be parsed and was skipped.
    fn parse_failed(&self, index: usize, raw: &str, error: &OutputParseError);

    /// All selected records were processed.
    fn run_finished(&self, _progress: &RunProgress) {}
}

/// Emits diagnostics as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn run_started(&self, total: usize, output: &Path) {
        tracing::info!(total, path = %output.display(), "Starting augmentation run");
    }

    fn record_written(&self, index: usize, progress: &RunProgress) {
        tracing::info!(
            record = index,
            written = progress.written,
            skipped = progress.skipped,
            total = progress.total,
            "Record written"
        );
    }

    fn parse_failed(&self, index: usize, raw: &str, error: &OutputParseError) {
        tracing::error!(
            record = index,
            error = %error,
            completion = %raw,
            "Failed to parse completion as a JSON object, skipping record"
        );
    }

    fn run_finished(&self, progress: &RunProgress) {
        tracing::info!(
            processed = progress.processed,
            written = progress.written,
            skipped = progress.skipped,
            "Augmentation run finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_progress_counters() {
        let mut progress = RunProgress::new(3);
        progress.record_written();
        progress.record_skipped();
        assert_eq!(progress.processed, 2);
        assert_eq!(progress.written, 1);
        assert_eq!(progress.skipped, 1);
        assert_eq!(progress.remaining(), 1);

        progress.record_written();
        assert_eq!(progress.remaining(), 0);
    }

    #[test]
    fn test_tracing_diagnostics_without_subscriber() {
        let diagnostics = TracingDiagnostics;
        let progress = RunProgress::new(1);
        diagnostics.run_started(1, Path::new("/tmp/out.jsonl"));
        diagnostics.parse_failed(0, "oops", &OutputParseError::Empty);
        diagnostics.run_finished(&progress);
    }
}
