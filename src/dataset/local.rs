//! Local file dataset source.
//!
//! Accepts three layouts:
//! - a `.jsonl` file, one JSON object per line (blank lines skipped)
//! - a `.json` file holding an array of objects
//! - a directory containing `<split>.jsonl`
//!
//! The split name is only used for the directory layout.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use super::{Dataset, DatasetRecord, DatasetSource};
use crate::error::DatasetError;

/// Reads datasets from JSON Lines or JSON files.
#[derive(Debug, Clone, Default)]
pub struct LocalDatasetSource;

impl LocalDatasetSource {
    pub fn new() -> Self {
        Self
    }

    fn resolve(name: &str, split: &str) -> Result<PathBuf, DatasetError> {
        let path = Path::new(name);
        if path.is_dir() {
            let split_file = path.join(format!("{}.jsonl", split));
            if !split_file.is_file() {
                return Err(DatasetError::SplitNotFound {
                    dataset: name.to_string(),
                    split: split.to_string(),
                });
            }
            return Ok(split_file);
        }
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        Err(DatasetError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl DatasetSource for LocalDatasetSource {
    async fn load(&self, name: &str, split: &str) -> Result<Dataset, DatasetError> {
        let path = Self::resolve(name, split)?;
        let content = fs::read_to_string(&path).await?;
        let source_name = path.display().to_string();

        let is_json_array = path.extension().map(|ext| ext == "json").unwrap_or(false);
        let records = if is_json_array {
            parse_json_array(&content, &source_name)?
        } else {
            parse_json_lines(&content, &source_name)?
        };

        tracing::info!(path = %source_name, rows = records.len(), "Loaded local dataset");
        Ok(Dataset::from_records(records))
    }
}

fn parse_json_lines(content: &str, source_name: &str) -> Result<Vec<DatasetRecord>, DatasetError> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(row, line)| {
            let value: Value = serde_json::from_str(line)?;
            DatasetRecord::try_from(value).map_err(|_| DatasetError::InvalidRow {
                source_name: source_name.to_string(),
                row,
            })
        })
        .collect()
}

fn parse_json_array(content: &str, source_name: &str) -> Result<Vec<DatasetRecord>, DatasetError> {
    let rows: Vec<Value> = serde_json::from_str(content)?;
    rows.into_iter()
        .enumerate()
        .map(|(row, value)| {
            DatasetRecord::try_from(value).map_err(|_| DatasetError::InvalidRow {
                source_name: source_name.to_string(),
                row,
            })
        })
        .collect()
}
