pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde::Serialize;

const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_SETTLE_MS: u64 = 1_500;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Identity presented to target sites: user agent plus locale headers.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            user_agent: DESKTOP_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

#[derive(Serialize)]
struct GotoOptions {
    #[serde(rename = "waitUntil")]
    wait_until: &'static str,
    timeout: u64,
}

#[derive(Serialize)]
struct ContentRequest<'a> {
    url: &'a str,
    #[serde(rename = "gotoOptions")]
    goto_options: GotoOptions,
    /// Extra settle time after navigation so dynamically rendered
    /// content is present before the DOM is serialized.
    #[serde(rename = "waitForTimeout")]
    wait_for_timeout: u64,
    #[serde(rename = "userAgent")]
    user_agent: &'a str,
    #[serde(rename = "setExtraHTTPHeaders")]
    extra_headers: serde_json::Value,
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    identity: Identity,
    navigation_timeout_ms: u64,
    settle_ms: u64,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            identity: Identity::default(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Fetch fully-rendered HTML for a URL via the Browserless /content
    /// endpoint, waiting for dynamic content to settle first.
    pub async fn content(&self, url: &str) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = ContentRequest {
            url,
            goto_options: GotoOptions {
                wait_until: "domcontentloaded",
                timeout: self.navigation_timeout_ms,
            },
            wait_for_timeout: self.settle_ms,
            user_agent: &self.identity.user_agent,
            extra_headers: serde_json::json!({
                "Accept-Language": self.identity.accept_language,
            }),
        };

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrowserlessError::Timeout(self.navigation_timeout_ms)
                } else {
                    BrowserlessError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}
