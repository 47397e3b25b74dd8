//! Output persistence for augmented records.
//!
//! Records are appended to a JSONL file, one JSON object per line. The file
//! and any missing parent directories are created on first write.

pub mod jsonl;
pub mod output_path;

pub use jsonl::{ensure_directory_exists, JsonlWriter, OutputSink};
pub use output_path::{derive_output_name, output_path, DEFAULT_OUTPUT_DIR};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured record parsed from a completion. Always a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputRecord(Map<String, Value>);

impl OutputRecord {
    /// Wraps a JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Get a field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All fields of the record.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Serializes the record as a single line of compact JSON.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl From<Map<String, Value>> for OutputRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
