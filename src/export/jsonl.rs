//! Append-only JSONL writer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::OutputRecord;
use crate::error::ExportError;

/// Destination for parsed output records.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Persists one record. Records are never rewritten.
    async fn write(&self, record: &OutputRecord) -> Result<(), ExportError>;
}

/// Creates `path` and all missing parents. Succeeds if it already exists.
pub async fn ensure_directory_exists(path: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| ExportError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes records to a line-delimited JSON file.
///
/// Every call opens the file in append mode, writes one line and flushes, so
/// records already written survive a later failure.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    path: PathBuf,
}

impl JsonlWriter {
    /// Creates a writer for `path`. Nothing is touched on disk until the first
    /// write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the target file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutputSink for JsonlWriter {
    async fn write(&self, record: &OutputRecord) -> Result<(), ExportError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_directory_exists(parent).await?;
        }

        let mut line = record.to_json_line()?;
        line.push('\n');

        let append_err = |source: std::io::Error| ExportError::Append {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(append_err)?;
        file.write_all(line.as_bytes()).await.map_err(append_err)?;
        file.flush().await.map_err(append_err)?;
        Ok(())
    }
}
