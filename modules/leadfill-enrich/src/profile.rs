use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use url::Url;

/// Facebook path segments that are not profiles.
const FACEBOOK_SKIP: &[&str] = &[
    "photo",
    "photos",
    "sharer",
    "share",
    "events",
    "groups",
    "watch",
    "marketplace",
    "login",
    "dialog",
    "plugins",
];

static RE_FACEBOOK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://(?:www\.|m\.)?facebook\.com/[A-Za-z0-9_.-]+"#).unwrap()
});

fn is_facebook_host(host: &str) -> bool {
    host == "facebook.com" || host.ends_with(".facebook.com")
}

/// Profile slug (first path segment) of a Facebook profile URL, if the
/// URL points at one.
fn profile_slug(url: &Url) -> Option<String> {
    if !url.host_str().is_some_and(is_facebook_host) {
        return None;
    }
    let slug = url.path_segments()?.find(|s| !s.is_empty())?.to_string();
    if FACEBOOK_SKIP.contains(&slug.as_str()) || slug == "profile.php" {
        return None;
    }
    Some(slug)
}

/// Whether the URL points at a Facebook profile (the target social
/// domain for identity matching).
pub fn is_profile_url(url: &str) -> bool {
    Url::parse(url).ok().as_ref().and_then(profile_slug).is_some()
}

/// Rewrite a Facebook profile URL to its canonical `/about` sub-page.
///
/// Total: non-Facebook URLs, non-profile Facebook paths, and malformed
/// input pass through unchanged. Idempotent for already-canonical URLs.
pub fn canonical_about_url(raw: &str) -> String {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            warn!(url = raw, error = %e, "Malformed candidate URL, passing through");
            return raw.to_string();
        }
    };

    let Some(slug) = profile_slug(&url) else {
        return raw.to_string();
    };

    let host = url.host_str().unwrap_or("www.facebook.com");
    format!("{}://{}/{}/about", url.scheme(), host, slug)
}

/// Harvest Facebook profile URLs from raw HTML, deduplicated in order of
/// first appearance.
pub fn find_profile_urls(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for m in RE_FACEBOOK_URL.find_iter(html) {
        let candidate = m.as_str().trim_end_matches('.');
        if !is_profile_url(candidate) {
            continue;
        }
        if seen.insert(candidate.to_string()) {
            urls.push(candidate.to_string());
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_profile_to_about() {
        assert_eq!(
            canonical_about_url("https://www.facebook.com/lodidental"),
            "https://www.facebook.com/lodidental/about"
        );
    }

    #[test]
    fn strips_trailing_slash_and_query() {
        assert_eq!(
            canonical_about_url("https://www.facebook.com/lodidental/?ref=search"),
            "https://www.facebook.com/lodidental/about"
        );
    }

    #[test]
    fn already_canonical_is_idempotent() {
        let canonical = "https://www.facebook.com/lodidental/about";
        assert_eq!(canonical_about_url(canonical), canonical);
        assert_eq!(canonical_about_url(&canonical_about_url(canonical)), canonical);
    }

    #[test]
    fn non_facebook_passes_through() {
        assert_eq!(
            canonical_about_url("https://lodidental.com/contact"),
            "https://lodidental.com/contact"
        );
    }

    #[test]
    fn non_profile_segments_pass_through() {
        assert_eq!(
            canonical_about_url("https://www.facebook.com/sharer/sharer.php?u=x"),
            "https://www.facebook.com/sharer/sharer.php?u=x"
        );
        assert_eq!(
            canonical_about_url("https://www.facebook.com/events/123"),
            "https://www.facebook.com/events/123"
        );
    }

    #[test]
    fn malformed_passes_through() {
        assert_eq!(canonical_about_url("not a url"), "not a url");
        assert_eq!(canonical_about_url(""), "");
    }

    #[test]
    fn profile_detection() {
        assert!(is_profile_url("https://www.facebook.com/lodidental"));
        assert!(is_profile_url("https://m.facebook.com/lodidental/about"));
        assert!(!is_profile_url("https://www.facebook.com/watch/123"));
        assert!(!is_profile_url("https://example.com/facebook.com"));
        assert!(!is_profile_url("nonsense"));
    }

    #[test]
    fn harvests_profile_urls_in_order() {
        let html = r#"
            <a href="https://www.facebook.com/lodidental">fb</a>
            <div onclick="open('https://facebook.com/drsusanaung')"></div>
            <a href="https://www.facebook.com/sharer/sharer.php?u=x">share</a>
            <a href="https://www.facebook.com/lodidental">again</a>
        "#;
        assert_eq!(
            find_profile_urls(html),
            vec![
                "https://www.facebook.com/lodidental",
                "https://facebook.com/drsusanaung",
            ]
        );
    }
}
