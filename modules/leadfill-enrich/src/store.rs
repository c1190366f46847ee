use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::debug;

use leadfill_core::{Column, LeadfillError, Row};
use sheets_client::SheetsClient;

use crate::ingest;

/// Seam to the tabular storage collaborator. Loads a snapshot of all
/// rows and writes individual cells back by row id and column.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn load_rows(&self) -> Result<Vec<Row>, LeadfillError>;

    async fn write_cell(
        &self,
        row_id: u32,
        column: Column,
        value: &str,
    ) -> Result<(), LeadfillError>;
}

pub(crate) fn set_cell(row: &mut Row, column: Column, value: &str) {
    let field = match column {
        Column::BusinessName => &mut row.business_name,
        Column::Domain => &mut row.domain,
        Column::OwnerName => &mut row.owner_name_raw,
        Column::Email => &mut row.email,
        Column::Phone => &mut row.phone,
        Column::Note => &mut row.note,
        Column::Status => &mut row.status,
    };
    *field = value.to_string();
}

fn row_from_cells(row_id: u32, cells: &[String]) -> Row {
    let cell = |column: Column| {
        cells
            .get(column.offset())
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };
    Row {
        row_id,
        business_name: cell(Column::BusinessName),
        domain: cell(Column::Domain),
        owner_name_raw: cell(Column::OwnerName),
        email: cell(Column::Email),
        phone: cell(Column::Phone),
        note: cell(Column::Note),
        status: cell(Column::Status),
    }
}

// --- Google Sheets store ---

pub struct SheetRowStore {
    client: SheetsClient,
    sheet_name: String,
}

impl SheetRowStore {
    pub fn new(client: SheetsClient, sheet_name: &str) -> Self {
        Self {
            client,
            sheet_name: sheet_name.to_string(),
        }
    }
}

#[async_trait]
impl RowStore for SheetRowStore {
    async fn load_rows(&self) -> Result<Vec<Row>, LeadfillError> {
        let range = format!("{}!A2:G", self.sheet_name);
        let values = self
            .client
            .read_range(&range)
            .await
            .map_err(|e| anyhow!("Failed to read sheet rows: {e}"))?;

        Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, cells)| row_from_cells(i as u32 + 2, &cells))
            .collect())
    }

    async fn write_cell(
        &self,
        row_id: u32,
        column: Column,
        value: &str,
    ) -> Result<(), LeadfillError> {
        let cell = format!("{}!{}{}", self.sheet_name, column.letter(), row_id);
        debug!(cell = cell.as_str(), value, "Writing cell");
        self.client
            .update_cell(&cell, value)
            .await
            .map_err(|e| LeadfillError::StorageWrite(format!("{cell}: {e}")))
    }
}

// --- CSV-file store ---

/// File-backed store: the whole file is rewritten on each cell write so
/// partial progress survives a crash mid-batch.
pub struct CsvRowStore {
    path: PathBuf,
    rows: Mutex<Vec<Row>>,
}

impl CsvRowStore {
    pub fn load(path: &Path) -> Result<Self, LeadfillError> {
        let rows = ingest::load_rows_from_csv(path)?;
        let already_processed = rows.iter().filter(|r| ingest::is_already_processed(r)).count();
        tracing::info!(
            path = %path.display(),
            rows = rows.len(),
            already_processed,
            "Loaded CSV rows"
        );
        Ok(Self {
            path: path.to_path_buf(),
            rows: Mutex::new(rows),
        })
    }
}

#[async_trait]
impl RowStore for CsvRowStore {
    async fn load_rows(&self) -> Result<Vec<Row>, LeadfillError> {
        Ok(self.rows.lock().expect("row store mutex poisoned").clone())
    }

    async fn write_cell(
        &self,
        row_id: u32,
        column: Column,
        value: &str,
    ) -> Result<(), LeadfillError> {
        let mut rows = self.rows.lock().expect("row store mutex poisoned");
        let row = rows
            .iter_mut()
            .find(|r| r.row_id == row_id)
            .ok_or_else(|| LeadfillError::StorageWrite(format!("no such row: {row_id}")))?;
        set_cell(row, column, value);
        ingest::write_rows_to_csv(&self.path, &rows)
    }
}

// --- In-memory store (tests) ---

#[cfg(any(test, feature = "test-support"))]
pub struct MemoryRowStore {
    rows: Mutex<Vec<Row>>,
    writes: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryRowStore {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            writes: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> Vec<Row> {
        self.rows.lock().expect("row store mutex poisoned").clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl RowStore for MemoryRowStore {
    async fn load_rows(&self) -> Result<Vec<Row>, LeadfillError> {
        Ok(self.snapshot())
    }

    async fn write_cell(
        &self,
        row_id: u32,
        column: Column,
        value: &str,
    ) -> Result<(), LeadfillError> {
        let mut rows = self.rows.lock().expect("row store mutex poisoned");
        let row = rows
            .iter_mut()
            .find(|r| r.row_id == row_id)
            .ok_or_else(|| LeadfillError::StorageWrite(format!("no such row: {row_id}")))?;
        set_cell(row, column, value);
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
