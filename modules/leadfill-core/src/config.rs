use std::env;
use std::time::Duration;

use crate::error::LeadfillError;

const DEFAULT_CONCURRENCY: usize = 5;
const MAX_CONCURRENCY: usize = 5;
const DEFAULT_MAX_ROWS: usize = 24;
const DEFAULT_ROW_TIMEOUT_SECS: u64 = 120;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage (sheet mode)
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub sheets_token: String,

    // Web retrieval
    pub browserless_url: String,
    pub browserless_token: Option<String>,

    // Language inference (optional; name-resolver tiers 1/4 are skipped
    // when absent)
    pub anthropic_api_key: Option<String>,

    // Matcher
    pub locality: Option<String>,

    /// Stop a row once an email is found instead of requiring both
    /// email and phone.
    pub stop_at_first_email: bool,

    // Scheduling
    pub concurrency: usize,
    pub max_rows: usize,
    pub row_timeout: Duration,
}

impl Config {
    /// Load configuration for sheet-backed runs. Sheets credentials are
    /// required.
    pub fn sheet_from_env() -> Result<Self, LeadfillError> {
        let mut config = Self::base_from_env()?;
        config.spreadsheet_id = required_env("SPREADSHEET_ID")?;
        config.sheets_token = required_env("SHEETS_TOKEN")?;
        Ok(config)
    }

    /// Load configuration for CSV-backed runs. No Sheets credentials
    /// needed.
    pub fn csv_from_env() -> Result<Self, LeadfillError> {
        Self::base_from_env()
    }

    fn base_from_env() -> Result<Self, LeadfillError> {
        Ok(Self {
            spreadsheet_id: String::new(),
            sheet_name: env::var("SHEET_NAME").unwrap_or_else(|_| "Sheet1".to_string()),
            sheets_token: String::new(),
            browserless_url: required_env("BROWSERLESS_URL")?,
            browserless_token: env::var("BROWSERLESS_TOKEN").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty()),
            locality: env::var("LEADFILL_LOCALITY").ok().filter(|l| !l.is_empty()),
            stop_at_first_email: parsed_env("LEADFILL_STOP_AT_FIRST_EMAIL", false)?,
            concurrency: parsed_env("LEADFILL_CONCURRENCY", DEFAULT_CONCURRENCY)?
                .clamp(1, MAX_CONCURRENCY),
            max_rows: parsed_env("LEADFILL_MAX_ROWS", DEFAULT_MAX_ROWS)?,
            row_timeout: Duration::from_secs(parsed_env(
                "LEADFILL_ROW_TIMEOUT_SECS",
                DEFAULT_ROW_TIMEOUT_SECS,
            )?),
        })
    }

    /// Log the loaded configuration without credentials.
    pub fn log_redacted(&self) {
        tracing::info!(
            browserless_url = self.browserless_url.as_str(),
            sheet = self.sheet_name.as_str(),
            inference = self.anthropic_api_key.is_some(),
            locality = self.locality.as_deref().unwrap_or("-"),
            stop_at_first_email = self.stop_at_first_email,
            concurrency = self.concurrency,
            max_rows = self.max_rows,
            row_timeout_secs = self.row_timeout.as_secs(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> Result<String, LeadfillError> {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LeadfillError::Config(format!("{key} environment variable is required")))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, LeadfillError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| LeadfillError::Config(format!("{key} has unparseable value '{raw}'"))),
        Err(_) => Ok(default),
    }
}
