use std::path::Path;

use anyhow::Context;

use leadfill_core::{
    Column, LeadfillError, Row, RETRY_SENTINELS, SENTINEL_ERROR, SENTINEL_NO_PHONE,
    SENTINEL_NO_PROFILE,
};

const HEADER: [&str; 7] = [
    "Business Name",
    "Domain",
    "Owner",
    "Email",
    "Phone",
    "Note",
    "Status",
];

/// Load rows from a CSV file with a header row. Data rows are numbered
/// from 2 so ids line up with sheet row numbering.
pub fn load_rows_from_csv(path: &Path) -> Result<Vec<Row>, LeadfillError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file '{}'", path.display()))?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Malformed CSV record in '{}'", path.display()))?;
        let cell = |column: Column| {
            record
                .get(column.offset())
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        rows.push(Row {
            row_id: i as u32 + 2,
            business_name: cell(Column::BusinessName),
            domain: cell(Column::Domain),
            owner_name_raw: cell(Column::OwnerName),
            email: cell(Column::Email),
            phone: cell(Column::Phone),
            note: cell(Column::Note),
            status: cell(Column::Status),
        });
    }

    Ok(rows)
}

/// Write rows back out with the standard header.
pub fn write_rows_to_csv(path: &Path, rows: &[Row]) -> Result<(), LeadfillError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| LeadfillError::StorageWrite(format!("{}: {e}", path.display())))?;

    writer
        .write_record(HEADER)
        .map_err(|e| LeadfillError::StorageWrite(e.to_string()))?;
    for row in rows {
        writer
            .write_record([
                &row.business_name,
                &row.domain,
                &row.owner_name_raw,
                &row.email,
                &row.phone,
                &row.note,
                &row.status,
            ])
            .map_err(|e| LeadfillError::StorageWrite(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| LeadfillError::StorageWrite(e.to_string()))
}

/// File-local form of the record classifier: a row is already processed
/// when both contact cells hold real (non-sentinel) values.
pub fn is_already_processed(row: &Row) -> bool {
    let email = row.email.trim();
    let phone = row.phone.trim();

    !email.is_empty()
        && !phone.is_empty()
        && !RETRY_SENTINELS.iter().any(|s| email.eq_ignore_ascii_case(s))
        && ![SENTINEL_NO_PHONE, SENTINEL_NO_PROFILE, SENTINEL_ERROR]
            .iter()
            .any(|s| phone.eq_ignore_ascii_case(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn loads_rows_numbered_from_two() {
        let file = write_temp_csv(
            "Business Name,Domain,Owner,Email,Phone,Note,Status\n\
             Lodi Dental Care,lodidental.com,Dr. Susana Ung,,,,\n\
             Sunrise Dental,sunrise.example,,front@sunrise.example,(209) 555-0101,,Ready\n",
        );

        let rows = load_rows_from_csv(file.path()).expect("load rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_id, 2);
        assert_eq!(rows[0].business_name, "Lodi Dental Care");
        assert_eq!(rows[1].row_id, 3);
        assert_eq!(rows[1].status, "Ready");
    }

    #[test]
    fn tolerates_short_records() {
        let file = write_temp_csv(
            "Business Name,Domain,Owner,Email,Phone,Note,Status\n\
             Lodi Dental Care,lodidental.com\n",
        );

        let rows = load_rows_from_csv(file.path()).expect("load rows");
        assert_eq!(rows[0].domain, "lodidental.com");
        assert_eq!(rows[0].email, "");
    }

    #[test]
    fn round_trips_through_writer() {
        let file = write_temp_csv(
            "Business Name,Domain,Owner,Email,Phone,Note,Status\n\
             Lodi Dental Care,lodidental.com,Dr. Susana Ung,a@b.com,555-0101,note,Ready\n",
        );

        let rows = load_rows_from_csv(file.path()).expect("load rows");
        write_rows_to_csv(file.path(), &rows).expect("write rows");
        let reloaded = load_rows_from_csv(file.path()).expect("reload rows");
        assert_eq!(rows, reloaded);
    }

    #[test]
    fn already_processed_requires_real_values_in_both_cells() {
        let mut row = Row::new(2, "Lodi Dental Care", "lodidental.com", "Susana Ung");
        assert!(!is_already_processed(&row));

        row.email = "front@lodidental.com".to_string();
        assert!(!is_already_processed(&row));

        row.phone = "(209) 555-0142".to_string();
        assert!(is_already_processed(&row));

        row.email = "No email found".to_string();
        assert!(!is_already_processed(&row));

        row.email = "front@lodidental.com".to_string();
        row.phone = "No phone found".to_string();
        assert!(!is_already_processed(&row));
    }
}
