use std::sync::Arc;

use tracing::{info, warn};

use ai_client::Claude;
use leadfill_core::{Config, LeadfillError, Row};

use crate::contacts::extract_contacts;
use crate::crawl::DomainCrawler;
use crate::matcher::IdentityMatcher;
use crate::names::NameResolver;
use crate::profile::{canonical_about_url, is_profile_url};
use crate::scraper::PageFetcher;
use crate::search::SearchResolver;

/// Note written when contacts came from the business's own site rather
/// than a matched profile.
pub const NOTE_FOUND_FROM_URL: &str = "Found from URL";

/// Terminal result of one row attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// At least one contact field was filled.
    Enriched {
        email: Option<String>,
        phone: Option<String>,
        /// Where the first contact came from (profile URL or crawl note).
        source: Option<String>,
    },
    /// Candidates were inspected but none passed identity scoring with
    /// usable contacts.
    NoMatch,
    /// No target-domain profile was encountered at all.
    NoProfile,
}

/// One row attempt: resolve owner name, search, fall back to a domain
/// crawl, then walk candidates in rank order until both fields fill.
pub struct RowPipeline {
    fetcher: Arc<dyn PageFetcher>,
    search: SearchResolver,
    names: NameResolver,
    crawler: DomainCrawler,
    matcher: IdentityMatcher,
    stop_at_first_email: bool,
}

impl RowPipeline {
    pub fn new(fetcher: Arc<dyn PageFetcher>, inference: Option<Claude>, config: &Config) -> Self {
        Self {
            search: SearchResolver::new(fetcher.clone()),
            names: NameResolver::new(inference, fetcher.clone()),
            crawler: DomainCrawler::new(fetcher.clone()),
            matcher: IdentityMatcher::new(config.locality.clone()),
            stop_at_first_email: config.stop_at_first_email,
            fetcher,
        }
    }

    /// Whether a row attempt is complete for the configured policy.
    fn fields_complete(&self, email: &Option<String>, phone: &Option<String>) -> bool {
        email.is_some() && (phone.is_some() || self.stop_at_first_email)
    }

    pub async fn process(&self, row: &Row) -> Result<RowOutcome, LeadfillError> {
        let owner = self
            .names
            .resolve(&row.owner_name_raw, &row.business_name, &row.domain)
            .await
            .unwrap_or_default();
        info!(row = row.row_id, owner = owner.as_str(), "Resolved owner name");

        let mut email: Option<String> = None;
        let mut phone: Option<String> = None;
        let mut source: Option<String> = None;

        let candidates = match self.search.resolve(&row.business_name, &owner).await {
            Ok(links) => links,
            Err(search_err) => {
                if row.domain.trim().is_empty() {
                    return Err(search_err);
                }
                warn!(
                    row = row.row_id,
                    error = %search_err,
                    "Search yielded nothing, falling back to domain crawl"
                );
                match self.crawler.harvest(&row.domain).await {
                    Ok(harvest) => {
                        email = harvest.emails.into_iter().next();
                        phone = harvest.phones.into_iter().next();
                        if email.is_some() || phone.is_some() {
                            source = Some(NOTE_FOUND_FROM_URL.to_string());
                        }
                        harvest.profile_urls
                    }
                    Err(crawl_err) => {
                        warn!(row = row.row_id, error = %crawl_err, "Domain crawl failed");
                        return Err(search_err);
                    }
                }
            }
        };

        let mut profiles_seen = 0usize;

        for candidate in candidates {
            if self.fields_complete(&email, &phone) {
                break;
            }

            let target = canonical_about_url(&candidate);
            let is_profile = is_profile_url(&target);

            let page = match self.fetcher.fetch_page(&target).await {
                Ok(page) => page,
                Err(e) => {
                    if is_profile {
                        // A dead profile on the target domain ends the
                        // attempt; the row is retried next run.
                        return Err(LeadfillError::ProfileFetch(format!("{target}: {e}")));
                    }
                    warn!(url = target.as_str(), error = %e, "Candidate fetch failed, skipping");
                    continue;
                }
            };
            if is_profile {
                profiles_seen += 1;
            }

            let display_name = page.display_name.clone().unwrap_or_default();
            if !self
                .matcher
                .is_match(&row.business_name, &display_name, &owner)
            {
                info!(
                    url = target.as_str(),
                    page = display_name.as_str(),
                    "Candidate rejected by identity match"
                );
                continue;
            }

            // First successful page wins per field; later candidates
            // only fill what is still missing.
            let contacts = extract_contacts(&page.text);
            if email.is_none() {
                email = contacts.emails.into_iter().next();
            }
            if phone.is_none() {
                phone = contacts.phones.into_iter().next();
            }
            if (email.is_some() || phone.is_some()) && source.is_none() {
                source = Some(target.clone());
            }
        }

        if email.is_some() || phone.is_some() {
            return Ok(RowOutcome::Enriched {
                email,
                phone,
                source,
            });
        }

        Ok(if profiles_seen == 0 {
            RowOutcome::NoProfile
        } else {
            RowOutcome::NoMatch
        })
    }
}
