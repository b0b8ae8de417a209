//! Error types for certledger.
//!
//! Library crates use [`CertLedgerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all certledger operations.
#[derive(Debug, thiserror::Error)]
pub enum CertLedgerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The text-acquisition collaborator could not produce text for a document.
    #[error("cannot read document: {reason}")]
    DocumentRead { reason: String },

    /// Roster could not be loaded (malformed CSV, missing `Name` column).
    #[error("roster error: {message}")]
    Roster { message: String },

    /// Ledger export failed.
    #[error("export error: {0}")]
    Export(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Data validation error (unexpected shape, bad identifier, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CertLedgerError>;

impl CertLedgerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a document read error from any displayable reason.
    pub fn document_read(reason: impl Into<String>) -> Self {
        Self::DocumentRead {
            reason: reason.into(),
        }
    }

    /// Create a roster error from any displayable message.
    pub fn roster(msg: impl Into<String>) -> Self {
        Self::Roster {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CertLedgerError::config("delimiter must be one byte");
        assert_eq!(err.to_string(), "config error: delimiter must be one byte");

        let err = CertLedgerError::roster("missing column 'Name'");
        assert!(err.to_string().contains("missing column 'Name'"));

        let err = CertLedgerError::document_read("stream did not contain valid UTF-8");
        assert_eq!(
            err.to_string(),
            "cannot read document: stream did not contain valid UTF-8"
        );
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CertLedgerError::io("/tmp/missing.txt", source);
        assert!(err.to_string().contains("missing.txt"));
        assert!(err.to_string().contains("gone"));
    }
}
