//! Shared types, error model, and configuration for certledger.
//!
//! This crate is the foundation depended on by all other certledger crates.
//! It provides:
//! - [`CertLedgerError`]: the unified error type
//! - Row types ([`ExtractedRecord`], [`ContactRecord`], [`Roster`], [`MergedRow`])
//! - Configuration ([`AppConfig`], [`BatchConfig`], [`ExportConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchConfig, DefaultsConfig, ExportConfig, ExportSettings, StorageConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CertLedgerError, Result};
pub use types::{
    CERTIFICATE_NUMBER_COLUMN, COURSE_CODE_COLUMN, ContactRecord, DocumentReport, ExtractedRecord,
    ISSUE_DATE_COLUMN, LedgerRunId, MergedRow, NAME_COLUMN, RECORD_COLUMNS, Roster,
};
