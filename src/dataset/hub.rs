//! Hugging Face dataset hub source.
//!
//! Reads a split through the datasets-server `rows` endpoint, which serves
//! rows as JSON pages. Pages are fetched sequentially until the reported
//! total row count is reached. The server cuts oversized cell values in
//! large pages; such rows are fetched again on their own, and a row that is
//! still cut short fails the load.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use super::{Dataset, DatasetRecord, DatasetSource};
use crate::error::DatasetError;

/// Default datasets-server endpoint.
pub const DEFAULT_HUB_URL: &str = "https://datasets-server.huggingface.co";

/// Dataset config used when none is given.
const DEFAULT_CONFIG: &str = "default";

/// Maximum page size accepted by the rows endpoint.
const PAGE_SIZE: usize = 100;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Dataset source backed by the Hugging Face datasets server.
pub struct HubDatasetSource {
    client: Client,
    base_url: String,
    token: Option<String>,
    config: String,
}

impl HubDatasetSource {
    /// Creates a hub source with an optional access token.
    pub fn new(token: Option<String>) -> Result<Self, DatasetError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| DatasetError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: DEFAULT_HUB_URL.to_string(),
            token,
            config: DEFAULT_CONFIG.to_string(),
        })
    }

    /// Points the source at a different datasets-server compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Selects a named dataset config (subset).
    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the dataset config name.
    pub fn config(&self) -> &str {
        &self.config
    }

    fn rows_url(
        &self,
        name: &str,
        split: &str,
        offset: usize,
        length: usize,
    ) -> Result<Url, DatasetError> {
        let offset = offset.to_string();
        let length = length.to_string();
        Url::parse_with_params(
            &format!("{}/rows", self.base_url),
            &[
                ("dataset", name),
                ("config", self.config.as_str()),
                ("split", split),
                ("offset", offset.as_str()),
                ("length", length.as_str()),
            ],
        )
        .map_err(|e| DatasetError::RequestFailed(format!("Invalid hub URL: {}", e)))
    }

    async fn fetch_page(
        &self,
        name: &str,
        split: &str,
        offset: usize,
        length: usize,
    ) -> Result<RowsPage, DatasetError> {
        let url = self.rows_url(name, split, offset, length)?;
        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| DatasetError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            let message = serde_json::from_str::<HubErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);

            if status.as_u16() == 404 {
                return Err(DatasetError::NotFound(format!("{} ({})", name, message)));
            }
            return Err(DatasetError::HubError {
                code: status.as_u16(),
                message,
            });
        }

        response
            .json::<RowsPage>()
            .await
            .map_err(|e| DatasetError::RequestFailed(format!("Failed to parse rows page: {}", e)))
    }

    /// Returns the complete value of a row that a page delivered truncated.
    async fn refetch_row(
        &self,
        name: &str,
        split: &str,
        entry: RowEntry,
    ) -> Result<Value, DatasetError> {
        tracing::debug!(
            dataset = name,
            row = entry.row_idx,
            cells = ?entry.truncated_cells,
            "Refetching truncated row"
        );

        let page = self.fetch_page(name, split, entry.row_idx, 1).await?;
        match page.rows.into_iter().find(|r| r.row_idx == entry.row_idx) {
            Some(single) if single.truncated_cells.is_empty() => Ok(single.row),
            Some(single) => Err(DatasetError::TruncatedRow {
                dataset: name.to_string(),
                row: single.row_idx,
                cells: single.truncated_cells,
            }),
            None => Err(DatasetError::TruncatedRow {
                dataset: name.to_string(),
                row: entry.row_idx,
                cells: entry.truncated_cells,
            }),
        }
    }
}

#[async_trait]
impl DatasetSource for HubDatasetSource {
    async fn load(&self, name: &str, split: &str) -> Result<Dataset, DatasetError> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.fetch_page(name, split, offset, PAGE_SIZE).await?;
            if page.rows.is_empty() {
                break;
            }

            for entry in page.rows {
                let row = entry.row_idx;
                let value = if entry.truncated_cells.is_empty() {
                    entry.row
                } else {
                    self.refetch_row(name, split, entry).await?
                };
                let record = DatasetRecord::try_from(value).map_err(|_| {
                    DatasetError::InvalidRow {
                        source_name: name.to_string(),
                        row,
                    }
                })?;
                records.push(record);
            }

            offset = records.len();
            tracing::debug!(
                dataset = name,
                split = split,
                fetched = offset,
                total = page.num_rows_total,
                "Fetched dataset page"
            );

            if offset >= page.num_rows_total {
                break;
            }
        }

        tracing::info!(dataset = name, split = split, rows = records.len(), "Loaded hub dataset");
        Ok(Dataset::from_records(records))
    }
}

/// One page of the rows endpoint.
#[derive(Debug, Deserialize)]
struct RowsPage {
    rows: Vec<RowEntry>,
    num_rows_total: usize,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row_idx: usize,
    row: Value,
    #[serde(default)]
    truncated_cells: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HubErrorResponse {
    error: String,
}
