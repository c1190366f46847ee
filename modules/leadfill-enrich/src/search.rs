use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use leadfill_core::LeadfillError;

use crate::scraper::PageFetcher;

const SEARCH_URL: &str = "https://www.google.com/search";
const MAX_CANDIDATES: usize = 10;

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).unwrap());

/// Hosts that are part of the search surface itself, never candidates.
const INTERNAL_HOST_MARKERS: &[&str] =
    &["google.", "gstatic.", "googleusercontent.", "webcache."];

/// Resolves a (business, owner) pair to ranked candidate profile URLs
/// through a web search issued via the rendered-page fetcher.
pub struct SearchResolver {
    fetcher: Arc<dyn PageFetcher>,
}

impl SearchResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn resolve(
        &self,
        business_name: &str,
        owner_name: &str,
    ) -> Result<Vec<String>, LeadfillError> {
        let query = format!("{business_name} {owner_name} facebook");
        let url = Url::parse_with_params(SEARCH_URL, &[("q", query.as_str()), ("hl", "en")])
            .map_err(|e| LeadfillError::Search(format!("bad search URL: {e}")))?;

        // Short randomized courtesy delay so batched rows don't hammer
        // the search surface in lockstep.
        let delay_ms = 500 + rand::rng().random_range(0..500);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        info!(query = query.as_str(), "Resolving candidates via web search");

        let html = self
            .fetcher
            .fetch_raw(url.as_str())
            .await
            .map_err(|e| LeadfillError::Search(format!("search surface unreachable: {e}")))?;

        let links = extract_result_links(&html);
        if links.is_empty() {
            warn!(query = query.as_str(), "Search returned no navigable results");
            return Err(LeadfillError::Search(format!(
                "no navigable results for '{query}'"
            )));
        }

        info!(query = query.as_str(), count = links.len(), "Search resolved");
        Ok(links)
    }
}

/// Extract outbound result links from a search results page, in rank
/// order: unwrap `/url?q=` redirects, drop search-engine-internal hosts,
/// deduplicate, cap at `MAX_CANDIDATES`.
pub fn extract_result_links(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for cap in HREF_RE.captures_iter(html) {
        let raw = &cap[1];

        let resolved = if let Some(rest) = raw.strip_prefix("/url?") {
            match unwrap_redirect(rest) {
                Some(target) => target,
                None => continue,
            }
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            continue;
        };

        if INTERNAL_HOST_MARKERS.iter().any(|m| resolved.contains(m)) {
            continue;
        }

        if seen.insert(resolved.clone()) {
            links.push(resolved);
            if links.len() >= MAX_CANDIDATES {
                break;
            }
        }
    }

    links
}

/// Pull the `q` target out of a `/url?q=...` redirect query string.
fn unwrap_redirect(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.into_owned())
        .filter(|target| target.starts_with("http"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_links_in_rank_order() {
        let html = r#"
            <a href="https://www.facebook.com/lodidental"><h3>Lodi Dental</h3></a>
            <a href="https://lodidental.com/"><h3>Official site</h3></a>
        "#;
        assert_eq!(
            extract_result_links(html),
            vec!["https://www.facebook.com/lodidental", "https://lodidental.com/"]
        );
    }

    #[test]
    fn unwraps_redirect_links() {
        let html = r#"<a href="/url?q=https://www.facebook.com/lodidental&sa=U&ved=x">r</a>"#;
        assert_eq!(
            extract_result_links(html),
            vec!["https://www.facebook.com/lodidental"]
        );
    }

    #[test]
    fn drops_internal_links_and_dedupes() {
        let html = r#"
            <a href="https://www.google.com/preferences">settings</a>
            <a href="https://accounts.google.com/signin">sign in</a>
            <a href="https://www.facebook.com/lodidental">result</a>
            <a href="https://www.facebook.com/lodidental">same result</a>
            <a href="/relative/path">relative</a>
        "#;
        assert_eq!(
            extract_result_links(html),
            vec!["https://www.facebook.com/lodidental"]
        );
    }

    #[test]
    fn caps_result_count() {
        let mut html = String::new();
        for i in 0..30 {
            html.push_str(&format!(r#"<a href="https://example{i}.com/">x</a>"#));
        }
        assert_eq!(extract_result_links(&html).len(), MAX_CANDIDATES);
    }

    #[test]
    fn empty_page_yields_no_links() {
        assert!(extract_result_links("<html><body></body></html>").is_empty());
    }
}
