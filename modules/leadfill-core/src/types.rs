use serde::{Deserialize, Serialize};

/// Status marker meaning the row is fully enriched.
pub const SENTINEL_READY: &str = "Ready";
/// Status marker meaning the row is terminally negative and never retried.
pub const SENTINEL_SKIP: &str = "Processed – No results";

/// Written to the email cell when matched pages yielded no address.
pub const SENTINEL_NO_EMAIL: &str = "No email found";
/// Written to the phone cell when matched pages yielded no number.
pub const SENTINEL_NO_PHONE: &str = "No phone found";
/// Written to both contact cells when no target-domain profile was found.
pub const SENTINEL_NO_PROFILE: &str = "NO FB PAGE";
/// Written to both contact cells when the row's pipeline failed.
pub const SENTINEL_ERROR: &str = "Error";

/// Email-cell values that mark a row for retry on the next run.
/// Only the email cell drives retry classification; the phone cell may
/// hold "No phone found" without affecting state.
pub const RETRY_SENTINELS: &[&str] = &[SENTINEL_NO_EMAIL, SENTINEL_NO_PROFILE, SENTINEL_ERROR];

/// One business record under enrichment. `row_id` is the storage row
/// number (first data row is 2, after the header) and is stable for the
/// lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub row_id: u32,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub owner_name_raw: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub status: String,
}

impl Row {
    pub fn new(row_id: u32, business_name: &str, domain: &str, owner_name_raw: &str) -> Self {
        Self {
            row_id,
            business_name: business_name.to_string(),
            domain: domain.to_string(),
            owner_name_raw: owner_name_raw.to_string(),
            email: String::new(),
            phone: String::new(),
            note: String::new(),
            status: String::new(),
        }
    }
}

/// Column layout of the backing sheet: A..G.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    BusinessName,
    Domain,
    OwnerName,
    Email,
    Phone,
    Note,
    Status,
}

impl Column {
    /// Column letter in A1 notation.
    pub fn letter(self) -> char {
        match self {
            Column::BusinessName => 'A',
            Column::Domain => 'B',
            Column::OwnerName => 'C',
            Column::Email => 'D',
            Column::Phone => 'E',
            Column::Note => 'F',
            Column::Status => 'G',
        }
    }

    /// Zero-based offset within a row slice.
    pub fn offset(self) -> usize {
        (self.letter() as u8 - b'A') as usize
    }
}

/// Processing state derived from a row's current field values. Computed
/// fresh each run; there is no separate journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    /// No prior attempt recorded.
    Unprocessed,
    /// A prior attempt left a recoverable-failure sentinel.
    Retryable,
    /// Explicitly marked terminal-negative; never reprocessed.
    Skip,
    /// Enriched (or explicitly marked ready); never reprocessed.
    Done,
}

/// Classify a row from its persisted field values.
///
/// Terminal status markers compare exact after trimming; the recoverable
/// sentinels in the email cell compare case-insensitively.
pub fn classify(row: &Row) -> ProcessingState {
    let status = row.status.trim();
    if status == SENTINEL_READY {
        return ProcessingState::Done;
    }
    if status == SENTINEL_SKIP {
        return ProcessingState::Skip;
    }

    let outcome = row.email.trim();
    if outcome.is_empty() {
        return ProcessingState::Unprocessed;
    }
    if RETRY_SENTINELS.iter().any(|s| outcome.eq_ignore_ascii_case(s)) {
        return ProcessingState::Retryable;
    }

    ProcessingState::Done
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(email: &str, status: &str) -> Row {
        let mut row = Row::new(2, "Lodi Dental Care", "lodidental.com", "Susana Ung");
        row.email = email.to_string();
        row.status = status.to_string();
        row
    }

    #[test]
    fn blank_outcome_is_unprocessed() {
        assert_eq!(classify(&row_with("", "")), ProcessingState::Unprocessed);
        assert_eq!(classify(&row_with("   ", "")), ProcessingState::Unprocessed);
    }

    #[test]
    fn retry_sentinels_are_retryable_case_insensitive() {
        assert_eq!(classify(&row_with("No email found", "")), ProcessingState::Retryable);
        assert_eq!(classify(&row_with("no email found", "")), ProcessingState::Retryable);
        assert_eq!(classify(&row_with("NO FB PAGE", "")), ProcessingState::Retryable);
        assert_eq!(classify(&row_with("no fb page", "")), ProcessingState::Retryable);
        assert_eq!(classify(&row_with("Error", "")), ProcessingState::Retryable);
        assert_eq!(classify(&row_with("error", "")), ProcessingState::Retryable);
    }

    #[test]
    fn real_email_is_done() {
        assert_eq!(
            classify(&row_with("front.desk@lodidental.com", "")),
            ProcessingState::Done
        );
    }

    #[test]
    fn status_markers_take_priority() {
        // A Ready marker wins even over a retry sentinel in the email cell.
        assert_eq!(classify(&row_with("Error", "Ready")), ProcessingState::Done);
        assert_eq!(
            classify(&row_with("", "Processed – No results")),
            ProcessingState::Skip
        );
    }

    #[test]
    fn error_sentinel_round_trips_to_retryable() {
        // A row written with the error sentinel must be retried next run.
        let row = row_with(SENTINEL_ERROR, "");
        assert_eq!(classify(&row), ProcessingState::Retryable);
    }

    #[test]
    fn classify_is_deterministic() {
        let row = row_with("No email found", "");
        let first = classify(&row);
        for _ in 0..10 {
            assert_eq!(classify(&row), first);
        }
    }

    #[test]
    fn column_letters_and_offsets() {
        assert_eq!(Column::BusinessName.letter(), 'A');
        assert_eq!(Column::Email.letter(), 'D');
        assert_eq!(Column::Status.letter(), 'G');
        assert_eq!(Column::Email.offset(), 3);
        assert_eq!(Column::Status.offset(), 6);
    }
}
