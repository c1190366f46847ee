use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use crate::contacts::extract_contacts;
use crate::profile::find_profile_urls;
use crate::scraper::PageFetcher;

/// Landing page plus at most this many internal pages.
const MAX_CRAWL_PAGES: usize = 5;

/// Internal path fragments most likely to carry contact details,
/// crawled before anything else.
const PRIORITY_PATHS: &[&str] = &["contact", "about", "team", "staff", "meet"];

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).unwrap());

/// Contacts and social profile URLs harvested from a business's own
/// site.
#[derive(Debug, Default)]
pub struct CrawlHarvest {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub profile_urls: Vec<String>,
}

/// Prefix a bare domain with https://.
pub fn seed_url(domain: &str) -> String {
    let domain = domain.trim();
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

/// Shallow crawler over a row's seed domain, used when search turns up
/// no usable candidates.
pub struct DomainCrawler {
    fetcher: Arc<dyn PageFetcher>,
}

impl DomainCrawler {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Crawl the seed domain, harvesting contacts and Facebook profile
    /// URLs. Fails only if the landing page itself is unreachable;
    /// internal page failures are skipped.
    pub async fn harvest(&self, domain: &str) -> Result<CrawlHarvest> {
        let start = seed_url(domain);
        let mut harvest = CrawlHarvest::default();
        let mut seen_profiles = HashSet::new();

        let landing_html = self.fetcher.fetch_raw(&start).await?;
        collect(&start, &landing_html, &mut harvest, &mut seen_profiles);

        let internal = internal_links(&landing_html, &start);
        for link in internal.into_iter().take(MAX_CRAWL_PAGES - 1) {
            let html = match self.fetcher.fetch_raw(&link).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = link.as_str(), error = %e, "Internal page fetch failed, skipping");
                    continue;
                }
            };
            collect(&link, &html, &mut harvest, &mut seen_profiles);
        }

        info!(
            domain,
            emails = harvest.emails.len(),
            phones = harvest.phones.len(),
            profiles = harvest.profile_urls.len(),
            "Domain crawl complete"
        );
        Ok(harvest)
    }
}

/// Contacts come from the rendered text; profile links from the raw
/// HTML (hrefs and inline handlers both count).
fn collect(
    url: &str,
    html: &str,
    harvest: &mut CrawlHarvest,
    seen_profiles: &mut HashSet<String>,
) {
    let page = crate::scraper::render_page(url, html);
    let contacts = extract_contacts(&page.text);
    harvest.emails.extend(contacts.emails);
    harvest.phones.extend(contacts.phones);

    for profile in find_profile_urls(html) {
        if seen_profiles.insert(profile.clone()) {
            harvest.profile_urls.push(profile);
        }
    }
}

/// Same-host links from a landing page, contact/about-style paths
/// first, original order otherwise, deduplicated.
fn internal_links(html: &str, base: &str) -> Vec<String> {
    let Ok(base_url) = Url::parse(base) else {
        return Vec::new();
    };
    let host = base_url.host_str().unwrap_or_default().to_string();

    let mut seen = HashSet::new();
    let mut priority = Vec::new();
    let mut rest = Vec::new();

    for cap in HREF_RE.captures_iter(html) {
        let raw = &cap[1];
        if raw.starts_with('#') || raw.starts_with("mailto:") || raw.starts_with("tel:") {
            continue;
        }
        let Ok(resolved) = base_url.join(raw) else {
            continue;
        };
        if resolved.host_str() != Some(host.as_str()) {
            continue;
        }

        let mut url = resolved;
        url.set_fragment(None);
        let text = url.to_string();
        if text.trim_end_matches('/') == base.trim_end_matches('/') || !seen.insert(text.clone()) {
            continue;
        }

        let path = url.path().to_lowercase();
        if PRIORITY_PATHS.iter().any(|p| path.contains(p)) {
            priority.push(text);
        } else {
            rest.push(text);
        }
    }

    priority.extend(rest);
    priority
}
