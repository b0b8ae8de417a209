//! Roster loading from headered CSV.
//!
//! The `Name` column is the join key and must be present. Every other column
//! is carried through untouched, in header order.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use certledger_shared::{CertLedgerError, ContactRecord, NAME_COLUMN, Result, Roster};

/// Load a roster CSV from disk.
pub fn load_roster(path: &Path) -> Result<Roster> {
    let file = std::fs::File::open(path).map_err(|e| CertLedgerError::io(path, e))?;
    let roster = parse_roster(file)?;
    info!(path = %path.display(), contacts = roster.len(), columns = roster.columns.len(), "loaded roster");
    Ok(roster)
}

/// Parse a roster from any CSV reader.
///
/// A missing `Name` column is a configuration problem and fails the whole
/// load. Short rows yield empty values; cells are not trimmed.
pub fn parse_roster<R: Read>(reader: R) -> Result<Roster> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = dedupe_headers(
        reader
            .headers()
            .map_err(|e| CertLedgerError::roster(format!("cannot read header: {e}")))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string()),
    );

    let name_idx = headers.iter().position(|h| h == NAME_COLUMN).ok_or_else(|| {
        CertLedgerError::roster(format!(
            "missing required column '{NAME_COLUMN}' (found: {})",
            headers.join(", ")
        ))
    })?;

    // Attribute columns: everything but the first `Name`, header order kept.
    let attribute_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != name_idx)
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let mut contacts = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| CertLedgerError::roster(format!("row {}: {e}", line + 2)))?;

        let name = record.get(name_idx).unwrap_or("").to_string();
        let attributes = attribute_columns
            .iter()
            .map(|(i, column)| (column.clone(), record.get(*i).unwrap_or("").to_string()));

        contacts.push(ContactRecord::new(name, attributes));
    }

    debug!(contacts = contacts.len(), "parsed roster rows");

    Ok(Roster::new(
        attribute_columns.into_iter().map(|(_, c)| c).collect(),
        contacts,
    ))
}

/// Rename repeated headers `X`, `X` to `X`, `X.1` so every column keeps its values.
fn dedupe_headers(headers: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();

    for header in headers {
        let mut name = header;
        let mut count = seen.get(&name).copied().unwrap_or(0);
        let renamed = count > 0;
        while count > 0 {
            seen.insert(name.clone(), count + 1);
            name = format!("{name}.{count}");
            count = seen.get(&name).copied().unwrap_or(0);
        }
        if renamed {
            debug!(column = %name, "renamed repeated roster header");
        }
        seen.insert(name.clone(), count + 1);
        out.push(name);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_roster() {
        let csv = "\
Name,Phone,Email
Alice Smith,0400000000,alice@example.com
Bob Jones,,bob@example.com
";
        let roster = parse_roster(csv.as_bytes()).expect("parse");
        assert_eq!(roster.columns, vec!["Phone", "Email"]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.contacts[0].name, "Alice Smith");
        assert_eq!(roster.contacts[0].attribute("Phone"), "0400000000");
        assert_eq!(roster.contacts[1].attribute("Phone"), "");
    }

    #[test]
    fn name_column_need_not_be_first() {
        let csv = "DOB,Name,Mobile\n1990-01-01,Alice Smith,0400000000\n";
        let roster = parse_roster(csv.as_bytes()).expect("parse");
        assert_eq!(roster.columns, vec!["DOB", "Mobile"]);
        assert_eq!(roster.contacts[0].name, "Alice Smith");
        assert_eq!(roster.contacts[0].attribute("DOB"), "1990-01-01");
    }

    #[test]
    fn missing_name_column_is_an_error() {
        let csv = "Full Name,Phone\nAlice Smith,0400000000\n";
        let err = parse_roster(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CertLedgerError::Roster { .. }));
        assert!(err.to_string().contains("missing required column 'Name'"));
    }

    #[test]
    fn short_rows_and_bom_are_tolerated() {
        let csv = "\u{feff}Name,Phone,Email\nAlice Smith,0400000000\n";
        let roster = parse_roster(csv.as_bytes()).expect("parse");
        assert_eq!(roster.contacts[0].name, "Alice Smith");
        assert_eq!(roster.contacts[0].attribute("Email"), "");
    }

    #[test]
    fn header_only_roster_is_empty() {
        let roster = parse_roster("Name,Phone\n".as_bytes()).expect("parse");
        assert!(roster.is_empty());
        assert_eq!(roster.columns, vec!["Phone"]);
    }

    #[test]
    fn duplicate_names_keep_roster_order() {
        let csv = "Name,Phone\nAlice Smith,1\nAlice Smith,2\n";
        let roster = parse_roster(csv.as_bytes()).expect("parse");
        let phones: Vec<&str> = roster.contacts.iter().map(|c| c.attribute("Phone")).collect();
        assert_eq!(phones, vec!["1", "2"]);
    }

    #[test]
    fn repeated_headers_are_renamed() {
        let csv = "Name,Phone,Phone,Phone.1,Name\nAlice Smith,111,222,333,Alias\n";
        let roster = parse_roster(csv.as_bytes()).expect("parse");
        assert_eq!(roster.columns, vec!["Phone", "Phone.1", "Phone.1.1", "Name.1"]);

        let alice = &roster.contacts[0];
        assert_eq!(alice.name, "Alice Smith");
        assert_eq!(alice.attribute("Phone"), "111");
        assert_eq!(alice.attribute("Phone.1"), "222");
        assert_eq!(alice.attribute("Phone.1.1"), "333");
        assert_eq!(alice.attribute("Name.1"), "Alias");
    }

    #[test]
    fn load_roster_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clients.csv");
        std::fs::write(&path, "Name,Email\nAlice Smith,alice@example.com\n").expect("write");
        let roster = load_roster(&path).expect("load");
        assert_eq!(roster.len(), 1);

        let err = load_roster(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, CertLedgerError::Io { .. }));
    }
}
