//! Core row types shared by the extractor, reconciler, and export layers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header for the holder name column (also the roster join key).
pub const NAME_COLUMN: &str = "Name";
/// Header for the certificate number column.
pub const CERTIFICATE_NUMBER_COLUMN: &str = "Certificate Number";
/// Header for the issue date column.
pub const ISSUE_DATE_COLUMN: &str = "Date of Issue";
/// Header for the course code column.
pub const COURSE_CODE_COLUMN: &str = "Course Code";

/// Ledger columns contributed by certificate extraction, in export order.
pub const RECORD_COLUMNS: [&str; 4] = [
    NAME_COLUMN,
    CERTIFICATE_NUMBER_COLUMN,
    ISSUE_DATE_COLUMN,
    COURSE_CODE_COLUMN,
];

// ---------------------------------------------------------------------------
// LedgerRunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for ledger run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerRunId(pub Uuid);

impl LedgerRunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LedgerRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LedgerRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LedgerRunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ExtractedRecord
// ---------------------------------------------------------------------------

/// One row per (certificate, course code) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Holder's full name as printed.
    pub name: Option<String>,
    /// Identifier printed on the certificate.
    pub certificate_number: Option<String>,
    /// Raw `D-MMM-YY` date text, unparsed.
    pub issue_date: Option<String>,
    /// Competency code, always present.
    pub course_code: String,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A roster entry keyed by `name` with opaque pass-through attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Join key, compared byte-for-byte.
    pub name: String,
    /// Attribute column → value. Columns the source did not supply are absent.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ContactRecord {
    /// Build a contact from a name and `(column, value)` pairs.
    pub fn new<I, K, V>(name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value for `column`, or the empty marker when the contact has none.
    pub fn attribute(&self, column: &str) -> &str {
        self.attributes.get(column).map(String::as_str).unwrap_or("")
    }
}

/// An ordered roster together with its attribute column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Attribute columns (excluding `Name`) in source header order.
    pub columns: Vec<String>,
    /// Contacts in source order. Names may repeat.
    pub contacts: Vec<ContactRecord>,
}

impl Roster {
    pub fn new(columns: Vec<String>, contacts: Vec<ContactRecord>) -> Self {
        Self { columns, contacts }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MergedRow
// ---------------------------------------------------------------------------

/// An extracted record joined with zero-or-one roster contact.
///
/// `attributes` always carries every roster column, in roster column order;
/// columns without a matching contact hold `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRow {
    pub record: ExtractedRecord,
    pub attributes: Vec<(String, String)>,
}

impl MergedRow {
    /// Look up a pass-through roster attribute by column name.
    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this row found a roster contact.
    ///
    /// Only meaningful when the roster has at least one attribute column.
    pub fn has_contact_values(&self) -> bool {
        self.attributes.iter().any(|(_, v)| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// DocumentReport
// ---------------------------------------------------------------------------

/// Per-document bookkeeping for an extraction batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Document identifier as given by its text source.
    pub document: String,
    /// SHA-256 of the document text, when it could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Number of records the document contributed.
    pub record_count: usize,
    /// Read failure message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentReport {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = LedgerRunId::new();
        let parsed: LedgerRunId = id.to_string().parse().expect("parse LedgerRunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn contact_attribute_defaults_to_empty_marker() {
        let contact = ContactRecord::new("Alice Smith", [("Phone", "0400000000")]);
        assert_eq!(contact.attribute("Phone"), "0400000000");
        assert_eq!(contact.attribute("Email"), "");
    }

    #[test]
    fn merged_row_attribute_lookup() {
        let row = MergedRow {
            record: ExtractedRecord {
                name: Some("Alice Smith".into()),
                certificate_number: None,
                issue_date: None,
                course_code: "RIIHAN301E".into(),
            },
            attributes: vec![
                ("Phone".into(), "0400000000".into()),
                ("Email".into(), String::new()),
            ],
        };
        assert_eq!(row.attribute("Phone"), Some("0400000000"));
        assert_eq!(row.attribute("Email"), Some(""));
        assert_eq!(row.attribute("Fax"), None);
        assert!(row.has_contact_values());
    }

    #[test]
    fn roster_serializes_with_column_order() {
        let roster = Roster::new(
            vec!["Phone".into(), "Email".into()],
            vec![ContactRecord::new("Bob Jones", [("Email", "bob@example.com")])],
        );
        let json = serde_json::to_string(&roster).expect("serialize");
        let parsed: Roster = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.columns, vec!["Phone", "Email"]);
        assert_eq!(parsed.contacts[0].attribute("Email"), "bob@example.com");
        assert_eq!(parsed.len(), 1);
    }
}
