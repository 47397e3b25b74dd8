//! Dataset access for the augmentation pipeline.
//!
//! A [`Dataset`] is an ordered, in-memory collection of [`DatasetRecord`]s for
//! one split. The pipeline only needs three things from it: its length, an
//! index-range selection, and a seeded shuffle. Records are fetched in bulk by a
//! [`DatasetSource`]:
//!
//! - [`HubDatasetSource`] reads a split from the Hugging Face datasets server
//! - [`LocalDatasetSource`] reads `.jsonl` / `.json` files
//! - [`AutoDatasetSource`] picks local when the name is an existing path
//!
//! ```ignore
//! use augment_forge::dataset::{AutoDatasetSource, DatasetSource};
//!
//! let source = AutoDatasetSource::new(None)?;
//! let dataset = source.load("ContextualAI/tiny-wiki100-chunks", "train").await?;
//! let samples = dataset.shuffle(42).select(0..10);
//! ```

pub mod hub;
pub mod local;

pub use hub::{HubDatasetSource, DEFAULT_HUB_URL};
pub use local::LocalDatasetSource;

use std::ops::Range;
use std::path::Path;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DatasetError;

/// One row of an input dataset: field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetRecord(Map<String, Value>);

impl DatasetRecord {
    /// Wraps an existing JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns all fields of the record.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON encoding of the whole record.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

impl From<Map<String, Value>> for DatasetRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for DatasetRecord {
    type Error = Value;

    /// Only JSON objects are records; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}

/// An ordered collection of records for one dataset split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<DatasetRecord>,
}

impl Dataset {
    /// Creates a dataset from records, preserving their order.
    pub fn from_records(records: Vec<DatasetRecord>) -> Self {
        Self { records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keeps the records in `range`, clamped to the dataset bounds.
    pub fn select(mut self, range: Range<usize>) -> Self {
        let end = range.end.min(self.records.len());
        let start = range.start.min(end);
        self.records.truncate(end);
        self.records.drain(..start);
        self
    }

    /// Deterministically permutes the records with the given seed.
    ///
    /// The same seed applied to the same input always yields the same order.
    pub fn shuffle(mut self, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.records.shuffle(&mut rng);
        self
    }

    /// Iterates over the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DatasetRecord> {
        self.records.iter()
    }

    /// Returns the records as a slice.
    pub fn records(&self) -> &[DatasetRecord] {
        &self.records
    }

    /// Consumes the dataset, returning its records.
    pub fn into_records(self) -> Vec<DatasetRecord> {
        self.records
    }
}

impl IntoIterator for Dataset {
    type Item = DatasetRecord;
    type IntoIter = std::vec::IntoIter<DatasetRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a DatasetRecord;
    type IntoIter = std::slice::Iter<'a, DatasetRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Provider of dataset splits.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetches every record of `split` for the dataset `name`, in order.
    async fn load(&self, name: &str, split: &str) -> Result<Dataset, DatasetError>;
}

/// Reads from the local filesystem when the dataset name is an existing path,
/// and from the dataset hub otherwise.
pub struct AutoDatasetSource {
    local: LocalDatasetSource,
    hub: HubDatasetSource,
}

impl AutoDatasetSource {
    /// Creates a source with an optional hub token (`HF_TOKEN`).
    pub fn new(hub_token: Option<String>) -> Result<Self, DatasetError> {
        Ok(Self {
            local: LocalDatasetSource::new(),
            hub: HubDatasetSource::new(hub_token)?,
        })
    }

    /// Creates a source around an explicitly configured hub client.
    pub fn with_hub(hub: HubDatasetSource) -> Self {
        Self {
            local: LocalDatasetSource::new(),
            hub,
        }
    }
}

#[async_trait]
impl DatasetSource for AutoDatasetSource {
    async fn load(&self, name: &str, split: &str) -> Result<Dataset, DatasetError> {
        if Path::new(name).exists() {
            tracing::debug!(dataset = name, "Loading dataset from local path");
            self.local.load(name, split).await
        } else {
            self.hub.load(name, split).await
        }
    }
}
