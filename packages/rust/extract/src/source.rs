//! Text-acquisition collaborators.
//!
//! Converting a certificate into text is outside the extractor: a
//! [`TextSource`] hands over the full text of one document, or fails for that
//! document alone.

use std::path::{Path, PathBuf};

use tracing::debug;

use certledger_shared::{CertLedgerError, Result};

/// Trait for anything that can produce the text content of one document.
pub trait TextSource: Send + Sync {
    /// Identifier used when reporting results and failures for this document.
    fn identifier(&self) -> &str;

    /// Produce the concatenated page text of the document.
    fn read_text(&self) -> Result<String>;
}

// ---------------------------------------------------------------------------
// FileTextSource
// ---------------------------------------------------------------------------

/// Reads an already-converted UTF-8 text file from disk.
#[derive(Debug, Clone)]
pub struct FileTextSource {
    path: PathBuf,
    identifier: String,
}

impl FileTextSource {
    /// The identifier is the file name, falling back to the full path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, identifier }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSource for FileTextSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn read_text(&self) -> Result<String> {
        let bytes = std::fs::read(&self.path).map_err(|e| CertLedgerError::io(&self.path, e))?;
        String::from_utf8(bytes).map_err(|e| CertLedgerError::document_read(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// InlineTextSource
// ---------------------------------------------------------------------------

/// A document whose text is already in memory.
#[derive(Debug, Clone)]
pub struct InlineTextSource {
    identifier: String,
    text: String,
}

impl InlineTextSource {
    pub fn new(identifier: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            text: text.into(),
        }
    }
}

impl TextSource for InlineTextSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn read_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }
}

// ---------------------------------------------------------------------------
// Document discovery
// ---------------------------------------------------------------------------

/// Expand input paths into an ordered list of document files.
///
/// Files are kept in the order given. Each directory is replaced by its
/// direct children whose extension matches `extension` (case-insensitive),
/// sorted by file name.
pub fn discover_documents(inputs: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            documents.push(input.clone());
            continue;
        }

        let entries = std::fs::read_dir(input).map_err(|e| CertLedgerError::io(input, e))?;
        let mut found: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| CertLedgerError::io(input, e))?.path();
            let matches = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
            if matches {
                found.push(path);
            }
        }
        found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        debug!(dir = %input.display(), count = found.len(), "expanded document directory");
        documents.extend(found);
    }

    Ok(documents)
}

/// Wrap each path in a [`FileTextSource`].
pub fn file_sources(paths: &[PathBuf]) -> Vec<FileTextSource> {
    paths.iter().map(FileTextSource::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_reads_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("alice.txt");
        std::fs::write(&path, "Certificate Number: ABC123").expect("write");

        let source = FileTextSource::new(&path);
        assert_eq!(source.identifier(), "alice.txt");
        assert_eq!(source.read_text().expect("read"), "Certificate Number: ABC123");
    }

    #[test]
    fn file_source_missing_file_is_io_error() {
        let source = FileTextSource::new("/definitely/not/here.txt");
        let err = source.read_text().unwrap_err();
        assert!(matches!(err, CertLedgerError::Io { .. }));
    }

    #[test]
    fn file_source_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("corrupt.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x9f]).expect("write");

        let err = FileTextSource::new(&path).read_text().unwrap_err();
        assert!(matches!(err, CertLedgerError::DocumentRead { .. }));
    }

    #[test]
    fn discover_expands_directories_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.txt", "a.TXT", "c.pdf", "notes.md"] {
            std::fs::write(dir.path().join(name), "").expect("write");
        }
        std::fs::create_dir(dir.path().join("nested.txt")).expect("mkdir");

        let extra = PathBuf::from("/explicit/file.txt");
        let docs = discover_documents(&[extra.clone(), dir.path().to_path_buf()], "txt")
            .expect("discover");

        let names: Vec<String> = docs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["file.txt", "a.TXT", "b.txt"]);
        assert_eq!(docs[0], extra);
    }
}
