use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{info, warn};

use browserless_client::BrowserlessClient;

/// One fetched candidate page, reduced to what the pipeline needs.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    /// Page heading (first `<h1>`), falling back to the document title.
    pub display_name: Option<String>,
    /// Visible text of the page.
    pub text: String,
}

/// Seam to the web-retrieval collaborator. `fetch_raw` returns rendered
/// HTML; `fetch_page` reduces it to display name + visible text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_raw(&self, url: &str) -> Result<String>;

    async fn fetch_page(&self, url: &str) -> Result<RenderedPage> {
        let html = self.fetch_raw(url).await?;
        Ok(render_page(url, &html))
    }

    fn name(&self) -> &str;
}

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());

/// Reduce rendered HTML to a `RenderedPage`.
pub fn render_page(url: &str, html: &str) -> RenderedPage {
    RenderedPage {
        url: url.to_string(),
        display_name: extract_display_name(html),
        text: visible_text(html, url),
    }
}

/// Page heading: inner text of the first `<h1>`, else the `<title>`.
pub fn extract_display_name(html: &str) -> Option<String> {
    for re in [&H1_RE, &TITLE_RE] {
        if let Some(cap) = re.captures(html) {
            let inner = TAG_RE.replace_all(&cap[1], " ");
            let name = decode_entities(&inner);
            let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    None
}

/// Visible text via Readability extraction, falling back to a plain tag
/// strip when Readability finds no main content (sparse profile pages).
pub fn visible_text(html: &str, url: &str) -> String {
    let parsed_url = url::Url::parse(url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };

    let text = transform_content_input(input, &config);
    if !text.trim().is_empty() {
        return text;
    }

    let stripped = SCRIPT_RE.replace_all(html, " ");
    let stripped = TAG_RE.replace_all(&stripped, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

// --- Browserless-backed fetcher ---

pub struct BrowserlessFetcher {
    client: BrowserlessClient,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        info!(base_url, "Using Browserless fetcher");
        Self {
            client: BrowserlessClient::new(base_url, token),
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn fetch_raw(&self, url: &str) -> Result<String> {
        info!(url, fetcher = "browserless", "Fetching URL");

        let html = self
            .client
            .content(url)
            .await
            .context("Browserless content request failed")?;

        if html.is_empty() {
            warn!(url, fetcher = "browserless", "Empty HTML response");
        }
        Ok(html)
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_h1() {
        let html = "<html><head><title>Site Title</title></head>\
                    <body><h1>Susana <b>Ung</b> DDS</h1></body></html>";
        assert_eq!(extract_display_name(html).as_deref(), Some("Susana Ung DDS"));
    }

    #[test]
    fn display_name_falls_back_to_title() {
        let html = "<html><head><title>Lodi Dental Care</title></head><body></body></html>";
        assert_eq!(extract_display_name(html).as_deref(), Some("Lodi Dental Care"));
    }

    #[test]
    fn display_name_missing() {
        assert_eq!(extract_display_name("<body><p>nothing here</p></body>"), None);
    }

    #[test]
    fn display_name_decodes_entities() {
        let html = "<h1>Smith &amp; Jones Dental</h1>";
        assert_eq!(
            extract_display_name(html).as_deref(),
            Some("Smith & Jones Dental")
        );
    }
}
