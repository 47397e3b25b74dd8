//! Output file naming.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// Directory used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "augmented_output";

/// File name derived from the prompt config and dataset names.
///
/// Slashes in the dataset name (`org/dataset`) become underscores.
pub fn derive_output_name(config_name: &str, dataset_name: &str) -> String {
    format!(
        "config_name__{}_dataset_name__{}.jsonl",
        config_name,
        dataset_name.replace('/', "_")
    )
}

/// Joins `file_name` onto `output_dir`, resolving a relative directory against
/// the current working directory.
pub fn output_path(output_dir: &Path, file_name: &str) -> Result<PathBuf, ExportError> {
    let dir = if output_dir.is_absolute() {
        output_dir.to_path_buf()
    } else {
        env::current_dir()
            .map_err(ExportError::WorkingDir)?
            .join(output_dir)
    };
    Ok(dir.join(file_name))
}
