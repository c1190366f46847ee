use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

use leadfill_core::{
    classify, Column, Config, LeadfillError, ProcessingState, Row, SENTINEL_ERROR,
    SENTINEL_NO_EMAIL, SENTINEL_NO_PHONE, SENTINEL_NO_PROFILE, SENTINEL_READY,
};

use crate::pipeline::{RowOutcome, RowPipeline};
use crate::store::RowStore;

/// Counters for one enrichment run.
#[derive(Debug, Default)]
pub struct EnrichStats {
    pub rows_total: usize,
    pub eligible: usize,
    pub dispatched: usize,
    pub enriched_full: usize,
    pub enriched_partial: usize,
    pub no_match: usize,
    pub no_profile: usize,
    pub failed: usize,
    pub skipped_done: usize,
    pub skipped_terminal: usize,
    pub skipped_ineligible: usize,
    pub remaining_eligible: usize,
}

impl EnrichStats {
    pub fn succeeded(&self) -> usize {
        self.enriched_full + self.enriched_partial
    }
}

impl fmt::Display for EnrichStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Enrichment Run Complete ===")?;
        writeln!(f, "Rows in storage:    {}", self.rows_total)?;
        writeln!(f, "Eligible:           {}", self.eligible)?;
        writeln!(f, "Dispatched:         {}", self.dispatched)?;
        writeln!(f, "Enriched (full):    {}", self.enriched_full)?;
        writeln!(f, "Enriched (partial): {}", self.enriched_partial)?;
        writeln!(f, "No identity match:  {}", self.no_match)?;
        writeln!(f, "No profile found:   {}", self.no_profile)?;
        writeln!(f, "Failed:             {}", self.failed)?;
        writeln!(f, "Skipped (done):     {}", self.skipped_done)?;
        writeln!(f, "Skipped (terminal): {}", self.skipped_terminal)?;
        writeln!(f, "Ineligible:         {}", self.skipped_ineligible)?;
        writeln!(f, "Remaining eligible: {}", self.remaining_eligible)?;
        Ok(())
    }
}

enum RowResult {
    Full,
    Partial,
    NoMatch,
    NoProfile,
    Failed,
}

/// A row must carry a business name and at least one of domain/owner to
/// be worth attempting.
fn is_eligible(row: &Row) -> bool {
    !row.business_name.trim().is_empty()
        && (!row.domain.trim().is_empty() || !row.owner_name_raw.trim().is_empty())
}

/// Top-level scheduler: classifies rows, runs pipelines through a
/// bounded pool, and records every outcome immediately. No row's
/// failure escapes past this boundary.
pub struct Orchestrator<S> {
    store: Arc<S>,
    pipeline: RowPipeline,
    concurrency: usize,
    max_rows: usize,
    row_timeout: Duration,
    stop_at_first_email: bool,
}

impl<S: RowStore> Orchestrator<S> {
    pub fn new(store: Arc<S>, pipeline: RowPipeline, config: &Config) -> Self {
        Self {
            store,
            pipeline,
            concurrency: config.concurrency,
            max_rows: config.max_rows,
            row_timeout: config.row_timeout,
            stop_at_first_email: config.stop_at_first_email,
        }
    }

    pub async fn run(&self) -> Result<EnrichStats, LeadfillError> {
        let rows = self.store.load_rows().await?;

        let mut stats = EnrichStats {
            rows_total: rows.len(),
            ..Default::default()
        };

        let mut eligible = Vec::new();
        for row in rows {
            match classify(&row) {
                ProcessingState::Done => stats.skipped_done += 1,
                ProcessingState::Skip => stats.skipped_terminal += 1,
                ProcessingState::Unprocessed | ProcessingState::Retryable => {
                    if is_eligible(&row) {
                        eligible.push(row);
                    } else {
                        stats.skipped_ineligible += 1;
                    }
                }
            }
        }

        stats.eligible = eligible.len();
        let batch: Vec<Row> = eligible.into_iter().take(self.max_rows).collect();
        stats.dispatched = batch.len();
        stats.remaining_eligible = stats.eligible - stats.dispatched;

        info!(
            eligible = stats.eligible,
            dispatched = stats.dispatched,
            concurrency = self.concurrency,
            "Dispatching batch"
        );

        let results: Vec<RowResult> =
            stream::iter(batch.into_iter().map(|row| self.process_row(row)))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        for result in results {
            match result {
                RowResult::Full => stats.enriched_full += 1,
                RowResult::Partial => stats.enriched_partial += 1,
                RowResult::NoMatch => stats.no_match += 1,
                RowResult::NoProfile => stats.no_profile += 1,
                RowResult::Failed => stats.failed += 1,
            }
        }

        Ok(stats)
    }

    /// One row end-to-end: pipeline under a wall-clock timeout, outcome
    /// persisted immediately. Every failure is converted to a sentinel.
    async fn process_row(&self, row: Row) -> RowResult {
        info!(
            row = row.row_id,
            business = row.business_name.as_str(),
            "Processing row"
        );

        match tokio::time::timeout(self.row_timeout, self.pipeline.process(&row)).await {
            Ok(Ok(RowOutcome::Enriched {
                email,
                phone,
                source,
            })) => {
                let full = email.is_some() && (phone.is_some() || self.stop_at_first_email);
                self.write(row.row_id, Column::Email, email.as_deref().unwrap_or(SENTINEL_NO_EMAIL))
                    .await;
                self.write(row.row_id, Column::Phone, phone.as_deref().unwrap_or(SENTINEL_NO_PHONE))
                    .await;
                if let Some(source) = source {
                    self.write(row.row_id, Column::Note, &source).await;
                }
                if full {
                    self.write(row.row_id, Column::Status, SENTINEL_READY).await;
                    info!(row = row.row_id, "Row enriched");
                    RowResult::Full
                } else {
                    info!(row = row.row_id, "Row partially enriched");
                    RowResult::Partial
                }
            }
            Ok(Ok(RowOutcome::NoMatch)) => {
                self.write(row.row_id, Column::Email, SENTINEL_NO_EMAIL).await;
                self.write(row.row_id, Column::Phone, SENTINEL_NO_PHONE).await;
                info!(row = row.row_id, "No candidate matched");
                RowResult::NoMatch
            }
            Ok(Ok(RowOutcome::NoProfile)) => {
                self.write(row.row_id, Column::Email, SENTINEL_NO_PROFILE).await;
                self.write(row.row_id, Column::Phone, SENTINEL_NO_PROFILE).await;
                info!(row = row.row_id, "No profile found");
                RowResult::NoProfile
            }
            Ok(Err(e)) => {
                warn!(row = row.row_id, error = %e, "Row pipeline failed");
                self.write(row.row_id, Column::Email, SENTINEL_ERROR).await;
                self.write(row.row_id, Column::Phone, SENTINEL_ERROR).await;
                RowResult::Failed
            }
            Err(_) => {
                warn!(
                    row = row.row_id,
                    timeout_secs = self.row_timeout.as_secs(),
                    "Row timed out, cancelling"
                );
                self.write(row.row_id, Column::Email, SENTINEL_ERROR).await;
                self.write(row.row_id, Column::Phone, SENTINEL_ERROR).await;
                RowResult::Failed
            }
        }
    }

    /// Persist one cell; a failed write is logged and never aborts the
    /// batch or the row's remaining writes.
    async fn write(&self, row_id: u32, column: Column, value: &str) {
        if let Err(e) = self.store.write_cell(row_id, column, value).await {
            error!(row = row_id, column = %column.letter(), error = %e, "Storage write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_needs_business_and_one_identity_field() {
        let full = Row::new(2, "Lodi Dental Care", "lodidental.com", "Susana Ung");
        assert!(is_eligible(&full));

        let no_business = Row::new(2, "", "lodidental.com", "Susana Ung");
        assert!(!is_eligible(&no_business));

        let owner_only = Row::new(2, "Lodi Dental Care", "", "Susana Ung");
        assert!(is_eligible(&owner_only));

        let domain_only = Row::new(2, "Lodi Dental Care", "lodidental.com", "");
        assert!(is_eligible(&domain_only));

        let name_only = Row::new(2, "Lodi Dental Care", "", "");
        assert!(!is_eligible(&name_only));
    }
}
