//! Batch extraction driver.
//!
//! Runs the extractor over an ordered list of documents. A document whose
//! text cannot be acquired is reported against its identifier and skipped;
//! the rest of the batch carries on.

use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use certledger_shared::{BatchConfig, CertLedgerError, DocumentReport, ExtractedRecord};

use crate::extractor;
use crate::source::TextSource;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// A document the text-acquisition collaborator could not read.
#[derive(Debug, thiserror::Error)]
#[error("failed to read document '{document}': {source}")]
pub struct DocumentReadError {
    /// Identifier of the failing document.
    pub document: String,
    #[source]
    pub source: CertLedgerError,
}

/// Result of extracting a whole batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// All records, in document order then course-code order.
    pub records: Vec<ExtractedRecord>,
    /// One report per input document, in input order.
    pub documents: Vec<DocumentReport>,
    /// Documents that could not be read, in input order.
    pub failures: Vec<DocumentReadError>,
}

impl BatchOutcome {
    fn push(&mut self, document: String, result: Result<Extraction, DocumentReadError>) {
        match result {
            Ok(extraction) => {
                self.documents.push(DocumentReport {
                    document,
                    fingerprint: Some(extraction.fingerprint),
                    record_count: extraction.records.len(),
                    error: None,
                });
                self.records.extend(extraction.records);
            }
            Err(err) => {
                warn!(document = %err.document, error = %err.source, "skipping unreadable document");
                self.documents.push(DocumentReport {
                    document,
                    fingerprint: None,
                    record_count: 0,
                    error: Some(err.source.to_string()),
                });
                self.failures.push(err);
            }
        }
    }
}

struct Extraction {
    records: Vec<ExtractedRecord>,
    fingerprint: String,
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Read and extract a single document.
pub fn extract_document(source: &dyn TextSource) -> Result<Vec<ExtractedRecord>, DocumentReadError> {
    read_and_extract(source).map(|e| e.records)
}

/// Extract every document sequentially, in order.
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn extract_all<S: TextSource>(documents: &[S]) -> BatchOutcome {
    let start = Instant::now();
    let mut outcome = BatchOutcome::default();

    for source in documents {
        outcome.push(source.identifier().to_string(), read_and_extract(source));
    }

    log_summary(&outcome, start);
    outcome
}

/// Extract documents in parallel, bounded by `config.concurrency`.
///
/// Reads run on the blocking pool. Results are collected in submission
/// order, so the outcome is identical to [`extract_all`].
#[instrument(skip_all, fields(documents = documents.len(), concurrency = config.concurrency))]
pub async fn extract_all_concurrent<S>(documents: Vec<S>, config: &BatchConfig) -> BatchOutcome
where
    S: TextSource + 'static,
{
    let start = Instant::now();
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1) as usize));

    let mut handles = Vec::with_capacity(documents.len());
    for source in documents {
        let identifier = source.identifier().to_string();
        // The semaphore is never closed, so a permit is always granted.
        let permit = semaphore.clone().acquire_owned().await.ok();

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            read_and_extract(&source)
        });
        handles.push((identifier, handle));
    }

    let mut outcome = BatchOutcome::default();
    for (identifier, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(DocumentReadError {
                document: identifier.clone(),
                source: CertLedgerError::document_read(format!("extraction task failed: {e}")),
            }),
        };
        outcome.push(identifier, result);
    }

    log_summary(&outcome, start);
    outcome
}

fn read_and_extract<S: TextSource + ?Sized>(source: &S) -> Result<Extraction, DocumentReadError> {
    let text = source.read_text().map_err(|e| DocumentReadError {
        document: source.identifier().to_string(),
        source: e,
    })?;

    Ok(Extraction {
        fingerprint: compute_hash(&text),
        records: extractor::extract(&text),
    })
}

/// Compute SHA-256 hash of document text.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn log_summary(outcome: &BatchOutcome, start: Instant) {
    info!(
        documents = outcome.documents.len(),
        records = outcome.records.len(),
        failed = outcome.failures.len(),
        duration_ms = start.elapsed().as_millis(),
        "batch extraction completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FileTextSource, InlineTextSource};

    /// A source that always fails, standing in for a corrupt document.
    struct BrokenSource(&'static str);

    impl TextSource for BrokenSource {
        fn identifier(&self) -> &str {
            self.0
        }

        fn read_text(&self) -> certledger_shared::Result<String> {
            Err(CertLedgerError::document_read("corrupt xref table"))
        }
    }

    enum TestSource {
        Inline(InlineTextSource),
        Broken(BrokenSource),
    }

    impl TextSource for TestSource {
        fn identifier(&self) -> &str {
            match self {
                Self::Inline(s) => s.identifier(),
                Self::Broken(s) => s.identifier(),
            }
        }

        fn read_text(&self) -> certledger_shared::Result<String> {
            match self {
                Self::Inline(s) => s.read_text(),
                Self::Broken(s) => s.read_text(),
            }
        }
    }

    fn cert(name: &str, codes: &[&str]) -> String {
        format!(
            "This is a statement that:\n{name}\nCertificate Number: C-{name}\nDate of Issue: 05-Jan-24\n{}",
            codes.join(" ")
        )
    }

    fn mixed_batch() -> Vec<TestSource> {
        vec![
            TestSource::Inline(InlineTextSource::new(
                "alice.txt",
                cert("Alice", &["RIIHAN301E", "RIIWHS204E"]),
            )),
            TestSource::Broken(BrokenSource("corrupt.txt")),
            TestSource::Inline(InlineTextSource::new("empty.txt", cert("Nobody", &[]))),
            TestSource::Inline(InlineTextSource::new("bob.txt", cert("Bob", &["RIIMPO320F"]))),
        ]
    }

    fn names_and_codes(outcome: &BatchOutcome) -> Vec<(Option<String>, String)> {
        outcome
            .records
            .iter()
            .map(|r| (r.name.clone(), r.course_code.clone()))
            .collect()
    }

    #[test]
    fn failing_document_does_not_abort_batch() {
        let outcome = extract_all(&mixed_batch());

        assert_eq!(
            names_and_codes(&outcome),
            vec![
                (Some("Alice".into()), "RIIHAN301E".into()),
                (Some("Alice".into()), "RIIWHS204E".into()),
                (Some("Bob".into()), "RIIMPO320F".into()),
            ]
        );

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].document, "corrupt.txt");
        assert!(outcome.failures[0].to_string().contains("corrupt xref table"));

        let counts: Vec<usize> = outcome.documents.iter().map(|d| d.record_count).collect();
        assert_eq!(counts, vec![2, 0, 0, 1]);
        assert!(outcome.documents[1].is_failed());
        assert!(outcome.documents[1].fingerprint.is_none());
        assert!(!outcome.documents[2].is_failed());
    }

    #[test]
    fn batch_length_is_sum_of_document_lengths() {
        let docs = mixed_batch();
        let expected: usize = docs
            .iter()
            .map(|d| extract_document(d).map(|r| r.len()).unwrap_or(0))
            .sum();
        assert_eq!(extract_all(&docs).records.len(), expected);
    }

    #[test]
    fn fingerprint_is_stable_sha256() {
        let docs = vec![
            InlineTextSource::new("a", "RIIHAN301E"),
            InlineTextSource::new("b", "RIIHAN301E"),
        ];
        let outcome = extract_all(&docs);
        let a = outcome.documents[0].fingerprint.clone().expect("fingerprint");
        assert_eq!(a.len(), 64);
        assert_eq!(Some(a), outcome.documents[1].fingerprint);
    }

    #[test]
    fn empty_batch() {
        let docs: Vec<InlineTextSource> = Vec::new();
        let outcome = extract_all(&docs);
        assert!(outcome.records.is_empty());
        assert!(outcome.documents.is_empty());
    }

    #[tokio::test]
    async fn concurrent_matches_sequential_order() {
        let sequential = extract_all(&mixed_batch());
        let config = BatchConfig {
            concurrency: 2,
            document_extension: "txt".into(),
        };
        let concurrent = extract_all_concurrent(mixed_batch(), &config).await;

        assert_eq!(names_and_codes(&concurrent), names_and_codes(&sequential));
        assert_eq!(concurrent.documents, sequential.documents);
        assert_eq!(concurrent.failures.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_with_zero_concurrency_still_runs() {
        let config = BatchConfig {
            concurrency: 0,
            document_extension: "txt".into(),
        };
        let docs = vec![InlineTextSource::new("a", "RIIHAN301E RIIWHS204E")];
        let outcome = extract_all_concurrent(docs, &config).await;
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_reads_files_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sources = Vec::new();
        for i in 0..12 {
            let path = dir.path().join(format!("{i:02}.txt"));
            std::fs::write(&path, cert(&format!("Holder{i}"), &["RIIHAN301E"])).expect("write");
            sources.push(FileTextSource::new(path));
        }
        sources.push(FileTextSource::new(dir.path().join("missing.txt")));

        let outcome = extract_all_concurrent(sources, &BatchConfig::default()).await;
        let names: Vec<String> = outcome
            .records
            .iter()
            .filter_map(|r| r.name.clone())
            .collect();
        let expected: Vec<String> = (0..12).map(|i| format!("Holder{i}")).collect();
        assert_eq!(names, expected);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].document, "missing.txt");
    }
}
