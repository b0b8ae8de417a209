//! Certificate field extraction and the batch extraction driver.
//!
//! This crate provides:
//! - [`extractor`]: regex rules turning one document's text into records
//! - [`source`]: the [`TextSource`] collaborator seam and file discovery
//! - [`batch`]: sequential and concurrent drivers with per-document failures

pub mod batch;
pub mod extractor;
pub mod source;

pub use batch::{
    BatchOutcome, DocumentReadError, extract_all, extract_all_concurrent,
    extract_document,
};
pub use extractor::{CertificateFields, course_codes, extract, extract_fields};
pub use source::{FileTextSource, InlineTextSource, TextSource, discover_documents, file_sources};
