//! Pipeline orchestration for certledger.
//!
//! This crate ties together document extraction, roster reconciliation,
//! ledger export, and run persistence into end-to-end workflows
//! (e.g., [`pipeline::build_ledger`]).

pub mod pipeline;

pub use pipeline::{
    ExtractConfig, LedgerConfig, LedgerSummary, ProgressReporter, RosterSource, SilentProgress,
    build_ledger, extract_records, import_roster,
};
