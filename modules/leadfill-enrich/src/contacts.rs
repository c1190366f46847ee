use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").unwrap());

/// Optional country code, optional parenthesized area code, 7-10 digit
/// groups with space/dash separators.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[ -]?)?(?:\(?\d{3}\)?[ -]?)?\d{3}[ -]?\d{4}").unwrap()
});

/// Candidate contacts pulled from one page, in order of first
/// appearance. Not deduplicated here; merging across pages happens at
/// the orchestration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty()
    }
}

/// Extract candidate emails and phone numbers from page text. Never
/// fails; no matches yields empty sequences.
pub fn extract_contacts(text: &str) -> ExtractionResult {
    ExtractionResult {
        emails: EMAIL_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect(),
        phones: PHONE_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_email_and_parenthesized_phone() {
        let result = extract_contacts("Contact: jane.doe@example.com or (415) 555-0199");
        assert_eq!(result.emails, vec!["jane.doe@example.com"]);
        assert!(result.phones.iter().any(|p| p.contains("415") && p.contains("555-0199")));
    }

    #[test]
    fn preserves_first_appearance_order() {
        let result = extract_contacts(
            "Reach front@office.com first, or billing@office.com. \
             Call 209-555-0142 or +1 415 555 0199.",
        );
        assert_eq!(result.emails, vec!["front@office.com", "billing@office.com"]);
        assert_eq!(result.phones.len(), 2);
        assert!(result.phones[0].contains("209"));
    }

    #[test]
    fn does_not_deduplicate() {
        let result = extract_contacts("a@b.com a@b.com");
        assert_eq!(result.emails.len(), 2);
    }

    #[test]
    fn no_matches_is_empty_not_error() {
        let result = extract_contacts("no contact information on this page");
        assert!(result.is_empty());
    }

    #[test]
    fn plain_seven_digit_number_matches() {
        let result = extract_contacts("front desk: 555-0142.");
        assert_eq!(result.phones, vec!["555-0142"]);
    }
}
