/// Identity matching between a business record and a candidate page's
/// display name. Listings and social display names rarely agree exactly
/// (nicknames, legal suffixes, rebrands), so matching is tiered:
/// dash-segment secondary identity, then bidirectional containment, then
/// an edit-distance-ratio fallback.

/// Titles, credentials, legal-entity suffixes, and generic business
/// words removed before comparison.
const STOP_WORDS: &[&str] = &[
    "dr", "dds", "dmd", "inc", "llc", "clinic", "center", "of", "the", "dental", "dentistry",
    "corp", "corporation", "ltd", "co",
];

/// Accept fuzzy matches at or below this distance ratio (0 is exact).
const FUZZY_THRESHOLD: f64 = 0.5;

pub struct IdentityMatcher {
    locality: Option<String>,
}

impl IdentityMatcher {
    pub fn new(locality: Option<String>) -> Self {
        Self {
            locality: locality.map(|l| l.to_lowercase()),
        }
    }

    /// Lowercase, strip punctuation, drop stop words (and the configured
    /// locality token), collapse whitespace.
    fn normalize(&self, name: &str) -> String {
        name.to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .filter(|word| !STOP_WORDS.contains(word))
            .filter(|word| self.locality.as_deref() != Some(*word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Does the candidate page plausibly belong to this practice/owner?
    pub fn is_match(&self, practice_name: &str, page_name: &str, owner_name: &str) -> bool {
        let clean_practice = self.normalize(practice_name);
        let clean_owner = self.normalize(owner_name);
        let clean_page = self.normalize(page_name);

        if clean_page.is_empty() {
            return false;
        }

        // A dash commonly appends a person's name to a brand
        // ("Lodi Dental Care - Dr. Susana Ung"); treat the trailing
        // segment as a secondary identity token.
        if practice_name.contains('-') || practice_name.contains('–') {
            if let Some(secondary) = practice_name.split(['-', '–']).nth(1) {
                let secondary = self.normalize(secondary);
                if !secondary.is_empty() && clean_page.contains(&secondary) {
                    return true;
                }
            }
        }

        for target in [&clean_practice, &clean_owner] {
            if !target.is_empty()
                && (clean_page.contains(target.as_str()) || target.contains(&clean_page))
            {
                return true;
            }
        }

        [&clean_practice, &clean_owner]
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| distance_ratio(&clean_page, t))
            .fold(f64::MAX, f64::min)
            <= FUZZY_THRESHOLD
    }
}

/// Levenshtein distance over chars, two-row dynamic programming.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Edit distance normalized by the longer input: 0.0 is exact, 1.0 is
/// fully dissimilar.
fn distance_ratio(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(a, b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> IdentityMatcher {
        IdentityMatcher::new(Some("Lodi".to_string()))
    }

    #[test]
    fn dash_segment_rule_accepts_person_suffix() {
        assert!(matcher().is_match(
            "Lodi Dental Care - Dr. Susana Ung",
            "Susana Ung DDS",
            "Susana Ung"
        ));
    }

    #[test]
    fn unrelated_business_is_rejected() {
        assert!(!matcher().is_match("Acme Corp", "Unrelated Business LLC", "John Smith"));
    }

    #[test]
    fn containment_accepts_owner_name() {
        assert!(matcher().is_match(
            "Sunrise Dental Group",
            "Dr. Maria Alvarez",
            "Maria Alvarez"
        ));
    }

    #[test]
    fn containment_is_bidirectional() {
        // Page name shorter than the practice name.
        assert!(matcher().is_match("Sunrise Dental of Lodi", "Sunrise", "unknown person"));
    }

    #[test]
    fn fuzzy_accepts_minor_spelling_difference() {
        assert!(matcher().is_match("Bright Smiles", "Brite Smiles", ""));
    }

    #[test]
    fn empty_page_name_is_rejected() {
        assert!(!matcher().is_match("Lodi Dental Care", "", "Susana Ung"));
        assert!(!matcher().is_match("Lodi Dental Care", "Dr. DDS LLC", "Susana Ung"));
    }

    #[test]
    fn locality_token_is_stripped() {
        let m = matcher();
        assert_eq!(m.normalize("Lodi Dental Care"), "care");
        assert_eq!(m.normalize("Dr. Susana Ung, D.D.S."), "susana ung d d s");
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }

    #[test]
    fn distance_ratio_bounds() {
        assert_eq!(distance_ratio("", ""), 0.0);
        assert_eq!(distance_ratio("abc", "abc"), 0.0);
        assert_eq!(distance_ratio("abc", "xyz"), 1.0);
    }
}
