//! Left outer join of extracted records against the contact roster.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument, warn};

use certledger_shared::{ContactRecord, ExtractedRecord, MergedRow, Roster};

/// Join output plus counters for reporting.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Exactly one row per input record, in input order.
    pub rows: Vec<MergedRow>,
    /// Rows that found a roster contact.
    pub matched: usize,
    /// Rows with no contact (including rows without a name).
    pub unmatched: usize,
    /// Names that appear more than once in the roster and were hit by a record.
    pub ambiguous_names: Vec<String>,
}

/// Name → first contact index, plus how many contacts share the name.
struct RosterIndex<'a> {
    by_name: HashMap<&'a str, (usize, usize)>,
}

impl<'a> RosterIndex<'a> {
    fn new(roster: &'a Roster) -> Self {
        let mut by_name: HashMap<&str, (usize, usize)> = HashMap::new();
        // A blank roster name never matches, just like a record without a name.
        for (i, contact) in roster
            .contacts
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.name.is_empty())
        {
            by_name
                .entry(contact.name.as_str())
                .and_modify(|(_, count)| *count += 1)
                .or_insert((i, 1));
        }
        Self { by_name }
    }

    fn lookup(&self, name: &str) -> Option<(usize, usize)> {
        if name.is_empty() {
            return None;
        }
        self.by_name.get(name).copied()
    }
}

/// Join records to the roster by exact name; see [`reconcile_detailed`].
pub fn reconcile(records: &[ExtractedRecord], roster: &Roster) -> Vec<MergedRow> {
    reconcile_detailed(records, roster).rows
}

/// Left outer join of `records` against `roster` on `name`.
///
/// Names compare byte-for-byte. When several contacts share a name the first
/// one in roster order is used and the ambiguity is logged. Records without a
/// name, or without a contact, get `""` for every roster column.
#[instrument(skip_all, fields(records = records.len(), contacts = roster.len()))]
pub fn reconcile_detailed(records: &[ExtractedRecord], roster: &Roster) -> Reconciliation {
    let index = RosterIndex::new(roster);
    let mut warned: HashSet<&str> = HashSet::new();
    let mut out = Reconciliation {
        rows: Vec::with_capacity(records.len()),
        ..Default::default()
    };

    for record in records {
        let contact = match record.name.as_deref().and_then(|n| index.lookup(n)) {
            Some((first, count)) => {
                let contact = &roster.contacts[first];
                if count > 1 && warned.insert(contact.name.as_str()) {
                    warn!(
                        name = %contact.name,
                        entries = count,
                        "roster has duplicate names, using first entry"
                    );
                    out.ambiguous_names.push(contact.name.clone());
                }
                out.matched += 1;
                Some(contact)
            }
            None => {
                debug!(
                    name = record.name.as_deref().unwrap_or(""),
                    course_code = %record.course_code,
                    "no roster contact"
                );
                out.unmatched += 1;
                None
            }
        };

        out.rows.push(merge(record, contact, &roster.columns));
    }

    info!(
        rows = out.rows.len(),
        matched = out.matched,
        unmatched = out.unmatched,
        ambiguous = out.ambiguous_names.len(),
        "reconciliation complete"
    );

    out
}

fn merge(record: &ExtractedRecord, contact: Option<&ContactRecord>, columns: &[String]) -> MergedRow {
    let attributes = columns
        .iter()
        .map(|column| {
            let value = contact.map(|c| c.attribute(column)).unwrap_or("");
            (column.clone(), value.to_string())
        })
        .collect();

    MergedRow {
        record: record.clone(),
        attributes,
    }
}
