//! Google Sheets row source
//!
//! Read-only client for the verification record store. Only the
//! `values.get` REST call is consumed; rows come back as sequences of
//! string cells in sheet order.

use crate::verify::RowSource;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while fetching verification rows
#[derive(Error, Debug)]
pub enum StoreError {
    /// HTTP transport failure
    #[error("Sheets request error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status from the Sheets API
    #[error("Sheets API returned status {0}")]
    Status(reqwest::StatusCode),
}

/// `values.get` response body; absent `values` means an empty range
#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Read-only Google Sheets client for one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    spreadsheet_id: String,
    api_key: String,
}

impl SheetsClient {
    /// Request timeout for a single range fetch
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a client for `spreadsheet_id` authenticated by `api_key`.
    #[must_use]
    pub fn new(spreadsheet_id: String, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            spreadsheet_id,
            api_key,
        }
    }
}

#[async_trait]
impl RowSource for SheetsClient {
    async fn fetch_rows(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            self.spreadsheet_id, range
        );

        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status));
        }

        let body: ValuesResponse = response.json().await?;
        debug!("Fetched {} rows from range {}", body.values.len(), range);
        Ok(body.values)
    }
}
