use std::sync::{Arc, LazyLock};
use std::time::Duration;

use ai_client::util::{strip_code_blocks, truncate_to_char_boundary};
use ai_client::Claude;
use anyhow::Result;
use rand::Rng;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use crate::crawl::seed_url;
use crate::scraper::PageFetcher;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_millis(500);

/// How much scraped site text to hand the extraction model.
const EXTRACTION_TEXT_BYTES: usize = 6_000;

/// Honorific prefixes dropped during cleaning.
const HONORIFICS: &[&str] = &["dr", "doctor", "mr", "mrs", "ms", "prof", "professor"];
/// Credential and generational suffixes dropped during cleaning.
const CREDENTIALS: &[&str] = &[
    "dds", "dmd", "md", "do", "dc", "phd", "jr", "sr", "ii", "iii", "iv",
];

/// Heuristic person-name patterns, strongest context first: "by FIRST
/// LAST", "- FIRST LAST", "Dr. FIRST LAST", "FIRST LAST DDS|DMD".
static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let word = r"[A-Z][A-Za-z'’-]+";
    vec![
        Regex::new(&format!(r"\bby\s+({word}(?:\s+{word}){{1,2}})")).unwrap(),
        Regex::new(&format!(r"[-–]\s*((?:Dr\.?\s+)?{word}(?:\s+{word}){{1,2}})")).unwrap(),
        Regex::new(&format!(r"\bDr\.?\s+({word}(?:\s+{word}){{0,2}})")).unwrap(),
        Regex::new(&format!(
            r"\b({word}(?:\s+{word}){{1,2}}),?\s+(?:DDS|DMD|D\.D\.S\.|D\.M\.D\.)"
        ))
        .unwrap(),
    ]
});

const PLAUSIBILITY_SYSTEM: &str =
    "You judge whether a string is a plausible real person's name. Answer strictly Yes or No.";

const GENERATION_SYSTEM: &str = "You extract person names from business listing data. \
Reply with exactly one person's name and nothing else, or the single word None \
if no person's name can be inferred.";

const OWNER_FIELDS_SYSTEM: &str = "You extract people from the text of a small-business \
website. Fill only fields that are explicitly supported by the text; leave the rest null.";

/// Structured fields extracted from the business's own site.
#[derive(Debug, Deserialize, JsonSchema)]
struct OwnerFields {
    /// Name of the practice/business owner, if stated.
    owner: Option<String>,
    /// Name of the CEO, if stated.
    ceo: Option<String>,
    /// Name of the founder, if stated.
    founder: Option<String>,
    /// Named contact person, if stated.
    contact_person: Option<String>,
}

/// Tiered owner-name resolution: clean-and-validate, pattern extraction,
/// site extraction, generative fallback, deterministic lead token.
/// External-call tiers retry with doubling backoff and degrade to the
/// next tier on failure.
pub struct NameResolver {
    inference: Option<Claude>,
    fetcher: Arc<dyn PageFetcher>,
}

impl NameResolver {
    pub fn new(inference: Option<Claude>, fetcher: Arc<dyn PageFetcher>) -> Self {
        if inference.is_none() {
            warn!("No inference credential; name plausibility and generative tiers disabled");
        }
        Self { inference, fetcher }
    }

    /// Resolve a usable owner name. Returns `None` only when every tier
    /// fails and the practice name itself is blank.
    pub async fn resolve(
        &self,
        raw_owner: &str,
        practice_name: &str,
        domain: &str,
    ) -> Option<String> {
        // Tier 1: clean the raw field and check plausibility.
        if let Some(client) = &self.inference {
            let cleaned = clean_name(raw_owner);
            if !cleaned.is_empty() && self.llm_plausible(client, &cleaned).await {
                return Some(cleaned);
            }
        }

        // Tier 2: heuristic patterns over the practice and owner fields.
        for source in [practice_name, raw_owner] {
            for hit in extract_name_patterns(source) {
                let cleaned = clean_name(&hit);
                if !cleaned.is_empty() && self.validate(&cleaned).await {
                    info!(name = cleaned.as_str(), source, "Owner name from pattern extraction");
                    return Some(cleaned);
                }
            }
        }

        // Tier 3: structured extraction from the business's own site.
        if !domain.trim().is_empty() {
            if let Some(name) = self.from_domain(domain).await {
                info!(name = name.as_str(), domain, "Owner name from site extraction");
                return Some(name);
            }
        }

        // Tier 4: generative fallback over the combined context.
        if let Some(client) = &self.inference {
            if let Some(name) = self.generate(client, raw_owner, practice_name).await {
                info!(name = name.as_str(), "Owner name from generative fallback");
                return Some(name);
            }
        }

        // Tier 5: lead token of the cleaned practice name. Terminal.
        lead_token(practice_name)
    }

    /// Plausibility check: the inference model when available, otherwise
    /// a shape heuristic.
    async fn validate(&self, name: &str) -> bool {
        match &self.inference {
            Some(client) => self.llm_plausible(client, name).await,
            None => heuristic_plausible(name),
        }
    }

    async fn llm_plausible(&self, client: &Claude, name: &str) -> bool {
        let user = format!("Is \"{name}\" a plausible real person's name?");
        match with_retry("plausibility check", || {
            client.chat_completion(PLAUSIBILITY_SYSTEM, user.clone())
        })
        .await
        {
            Ok(reply) => strip_code_blocks(&reply).to_lowercase().starts_with("yes"),
            Err(e) => {
                warn!(name, error = %e, "Plausibility check failed, using heuristic");
                heuristic_plausible(name)
            }
        }
    }

    async fn from_domain(&self, domain: &str) -> Option<String> {
        let url = seed_url(domain);
        let page = match with_retry("site scrape", || self.fetcher.fetch_page(&url)).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = url.as_str(), error = %e, "Site scrape failed, skipping tier");
                return None;
            }
        };

        let text = truncate_to_char_boundary(&page.text, EXTRACTION_TEXT_BYTES);
        if text.trim().is_empty() {
            return None;
        }

        match &self.inference {
            Some(client) => {
                let user = format!("Website text:\n\n{text}");
                let fields: OwnerFields = match with_retry("owner-field extraction", || {
                    client.extract(OWNER_FIELDS_SYSTEM, user.clone())
                })
                .await
                {
                    Ok(fields) => fields,
                    Err(e) => {
                        warn!(url = url.as_str(), error = %e, "Owner-field extraction failed");
                        return None;
                    }
                };

                [fields.owner, fields.ceo, fields.founder, fields.contact_person]
                    .into_iter()
                    .flatten()
                    .map(|raw| clean_name(&raw))
                    .find(|name| !name.is_empty() && heuristic_plausible(name))
            }
            None => extract_name_patterns(text)
                .into_iter()
                .map(|hit| clean_name(&hit))
                .find(|name| !name.is_empty() && heuristic_plausible(name)),
        }
    }

    async fn generate(&self, client: &Claude, raw_owner: &str, practice_name: &str) -> Option<String> {
        let user = format!(
            "Business listing: \"{practice_name}\"\nOwner field: \"{raw_owner}\"\n\n\
             Who is the person behind this business?"
        );
        let reply = match with_retry("name generation", || {
            client.chat_completion(GENERATION_SYSTEM, user.clone())
        })
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Name generation failed, skipping tier");
                return None;
            }
        };

        let reply = strip_code_blocks(&reply);
        if reply.is_empty() || reply.eq_ignore_ascii_case("none") {
            return None;
        }

        let cleaned = clean_name(reply);
        (!cleaned.is_empty() && heuristic_plausible(&cleaned)).then_some(cleaned)
    }
}

/// Strip honorifics, credentials, and punctuation; collapse whitespace.
/// Casing of the remaining tokens is preserved.
pub fn clean_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '\'' || *c == '-')
                .collect::<String>()
        })
        .filter(|token| {
            let lower = token.to_lowercase();
            !token.is_empty() && !HONORIFICS.contains(&lower.as_str()) && !CREDENTIALS.contains(&lower.as_str())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run the ordered name patterns over free text, all hits in order.
fn extract_name_patterns(text: &str) -> Vec<String> {
    let mut hits = Vec::new();
    for pattern in NAME_PATTERNS.iter() {
        for cap in pattern.captures_iter(text) {
            hits.push(cap[1].to_string());
        }
    }
    hits
}

/// Shape check used when no inference model is available: one to four
/// alphabetic tokens, no digits.
fn heuristic_plausible(name: &str) -> bool {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() > 4 {
        return false;
    }
    tokens.iter().all(|token| {
        token.len() >= 2
            && token.len() <= 20
            && token.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-')
    })
}

/// Tier 5: first word of the cleaned practice name, falling back to the
/// first raw word. `None` only for blank input.
fn lead_token(practice_name: &str) -> Option<String> {
    let cleaned = clean_name(practice_name);
    cleaned
        .split_whitespace()
        .next()
        .map(str::to_string)
        .or_else(|| practice_name.split_whitespace().next().map(str::to_string))
}

/// Bounded retry with doubling backoff and jitter.
async fn with_retry<T, F, Fut>(what: &'static str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut delay = RETRY_BASE;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    return Err(e);
                }
                let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                warn!(what, attempt, error = %e, "Call failed, retrying after backoff");
                tokio::time::sleep(delay + jitter).await;
                delay *= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;

    struct FailingFetcher;

    #[async_trait]
    impl PageFetcher for FailingFetcher {
        async fn fetch_raw(&self, url: &str) -> Result<String> {
            bail!("unreachable: {url}")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn resolver() -> NameResolver {
        NameResolver::new(None, Arc::new(FailingFetcher))
    }

    #[test]
    fn clean_name_strips_honorifics_and_credentials() {
        assert_eq!(clean_name("Dr. Susana Ung, DDS"), "Susana Ung");
        assert_eq!(clean_name("  Mr.  John   O'Neil Jr. "), "John O'Neil");
        assert_eq!(clean_name("DDS DMD"), "");
    }

    #[test]
    fn pattern_extraction_tries_strongest_context_first() {
        assert_eq!(
            extract_name_patterns("Smiles by Amanda Reyes"),
            vec!["Amanda Reyes"]
        );
        assert_eq!(
            extract_name_patterns("Lodi Dental Care - Dr. Susana Ung"),
            // The dash pattern fires first, then the bare Dr pattern.
            vec!["Dr. Susana Ung", "Susana Ung"]
        );
        assert_eq!(
            extract_name_patterns("Maria Alvarez, DDS — family dentistry"),
            vec!["Maria Alvarez"]
        );
        assert!(extract_name_patterns("Sunrise Dental").is_empty());
    }

    #[test]
    fn heuristic_rejects_non_names() {
        assert!(heuristic_plausible("Susana Ung"));
        assert!(heuristic_plausible("Jean-Luc O'Neil"));
        assert!(!heuristic_plausible(""));
        assert!(!heuristic_plausible("Suite 200"));
        assert!(!heuristic_plausible("a b c d e"));
    }

    #[tokio::test]
    async fn tier_two_resolves_from_raw_owner_field() {
        let name = resolver().resolve("Dr. Susana Ung", "Lodi Dental Care", "").await;
        assert_eq!(name.as_deref(), Some("Susana Ung"));
    }

    #[tokio::test]
    async fn tier_two_resolves_from_dashed_practice_name() {
        let name = resolver()
            .resolve("", "Lodi Dental Care - Dr. Susana Ung", "")
            .await;
        assert_eq!(name.as_deref(), Some("Susana Ung"));
    }

    #[tokio::test]
    async fn terminal_tier_always_yields_a_token() {
        // Every external collaborator is down and no pattern matches;
        // tier 5 must still produce a token for a non-empty practice.
        let name = resolver().resolve("", "Sunrise Dental", "").await;
        assert_eq!(name.as_deref(), Some("Sunrise"));
    }

    #[tokio::test]
    async fn blank_practice_yields_none() {
        assert_eq!(resolver().resolve("", "", "").await, None);
    }
}
