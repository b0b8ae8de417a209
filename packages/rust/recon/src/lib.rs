//! Roster reconciliation and ledger export.
//!
//! Pure engine crate: receives extracted records and a roster, returns the
//! merged ledger. Roster loading and CSV export are the thin collaborators
//! on either side of the join.

pub mod export;
pub mod join;
pub mod roster;

pub use export::{ledger_columns, parse_issue_date, write_ledger, write_ledger_file, write_records};
pub use join::{Reconciliation, reconcile, reconcile_detailed};
pub use roster::{load_roster, parse_roster};
