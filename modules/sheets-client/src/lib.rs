pub mod error;

pub use error::{Result, SheetsError};

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Client for one spreadsheet. Reads ranges and writes individual cells
/// through the Google Sheets values API.
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(token: &str, spreadsheet_id: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: SHEETS_API_URL.to_string(),
            token: token.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Read a range in A1 notation (e.g. `Sheet1!A2:G`). Rows shorter
    /// than the requested width come back short; callers pad as needed.
    pub async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = format!(
            "{}/{}/values/{}",
            self.base_url,
            self.spreadsheet_id,
            urlencode(range)
        );

        debug!(range, "Sheets read");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ValueRange = resp
            .json()
            .await
            .map_err(|e| SheetsError::Malformed(e.to_string()))?;
        Ok(body.values)
    }

    /// Write a single cell (e.g. `Sheet1!D7`) with a raw value. Only the
    /// addressed cell is touched.
    pub async fn update_cell(&self, cell: &str, value: &str) -> Result<()> {
        let url = format!(
            "{}/{}/values/{}?valueInputOption=RAW",
            self.base_url,
            self.spreadsheet_id,
            urlencode(cell)
        );

        debug!(cell, "Sheets write");

        let body = json!({ "values": [[value]] });

        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

/// Percent-encode the characters that appear in A1 ranges (`!`, `:`) and
/// sheet names with spaces. The values API rejects nothing else we emit.
fn urlencode(range: &str) -> String {
    range
        .chars()
        .map(|c| match c {
            '!' => "%21".to_string(),
            ':' => "%3A".to_string(),
            ' ' => "%20".to_string(),
            c => c.to_string(),
        })
        .collect()
}
