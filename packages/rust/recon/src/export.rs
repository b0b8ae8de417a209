//! Ledger export as delimited text.
//!
//! Header is `Name`, `Certificate Number`, `Date of Issue`, `Course Code`
//! followed by the roster attribute columns. Absent values are empty cells.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use certledger_shared::{CertLedgerError, ExportConfig, ExtractedRecord, MergedRow, RECORD_COLUMNS, Result};

/// Textual date layout printed on certificates, e.g. `05-Jan-24`.
const CERTIFICATE_DATE_FORMAT: &str = "%d-%b-%y";

/// Parse a certificate issue date such as `05-Jan-24`.
pub fn parse_issue_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), CERTIFICATE_DATE_FORMAT).ok()
}

/// Full ledger header for the given roster attribute columns.
///
/// A roster column named like a record column would repeat a header, so the
/// pair is written as `<column>_x` (certificate) and `<column>_y` (roster).
pub fn ledger_columns(roster_columns: &[String]) -> Vec<String> {
    let clashes = |column: &str| {
        RECORD_COLUMNS.contains(&column) && roster_columns.iter().any(|c| c == column)
    };

    let record = RECORD_COLUMNS.iter().map(|c| {
        if clashes(*c) {
            format!("{c}_x")
        } else {
            c.to_string()
        }
    });
    let roster = roster_columns.iter().map(|c| {
        if clashes(c.as_str()) {
            warn!(column = %c, "roster column shares a name with a certificate column");
            format!("{c}_y")
        } else {
            c.clone()
        }
    });

    record.chain(roster).collect()
}

/// Write the merged ledger with a header row.
pub fn write_ledger<W: Write>(
    rows: &[MergedRow],
    roster_columns: &[String],
    writer: W,
    config: &ExportConfig,
) -> Result<()> {
    let mut csv = writer_for(writer, config);
    csv.write_record(ledger_columns(roster_columns))
        .map_err(export_err)?;

    for row in rows {
        let mut cells = record_cells(&row.record, config);
        // Rows carry every roster column already; look up by name so a row
        // built against a different column order still lines up.
        cells.extend(
            roster_columns
                .iter()
                .map(|c| row.attribute(c).unwrap_or("").to_string()),
        );
        csv.write_record(&cells).map_err(export_err)?;
    }

    csv.flush()
        .map_err(|e| CertLedgerError::Export(e.to_string()))
}

/// Write extracted records only (no roster columns).
pub fn write_records<W: Write>(
    records: &[ExtractedRecord],
    writer: W,
    config: &ExportConfig,
) -> Result<()> {
    let mut csv = writer_for(writer, config);
    csv.write_record(RECORD_COLUMNS).map_err(export_err)?;
    for record in records {
        csv.write_record(record_cells(record, config))
            .map_err(export_err)?;
    }
    csv.flush()
        .map_err(|e| CertLedgerError::Export(e.to_string()))
}

/// Write the merged ledger to a file, creating parent directories.
pub fn write_ledger_file(
    path: &Path,
    rows: &[MergedRow],
    roster_columns: &[String],
    config: &ExportConfig,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CertLedgerError::io(parent, e))?;
    }
    let file = std::fs::File::create(path).map_err(|e| CertLedgerError::io(path, e))?;
    write_ledger(rows, roster_columns, std::io::BufWriter::new(file), config)?;
    info!(path = %path.display(), rows = rows.len(), "wrote ledger");
    Ok(())
}

fn writer_for<W: Write>(writer: W, config: &ExportConfig) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .from_writer(writer)
}

fn record_cells(record: &ExtractedRecord, config: &ExportConfig) -> Vec<String> {
    let issue_date = match record.issue_date.as_deref() {
        Some(raw) if config.normalize_dates => parse_issue_date(raw)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| raw.to_string()),
        Some(raw) => raw.to_string(),
        None => String::new(),
    };

    vec![
        record.name.clone().unwrap_or_default(),
        record.certificate_number.clone().unwrap_or_default(),
        issue_date,
        record.course_code.clone(),
    ]
}

fn export_err(e: csv::Error) -> CertLedgerError {
    CertLedgerError::Export(e.to_string())
}
