//! End-to-end ledger pipeline: documents → extract → reconcile → export → store.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use certledger_extract::{BatchOutcome, extract_all_concurrent, file_sources};
use certledger_recon::{Reconciliation, load_roster, reconcile_detailed, write_ledger_file};
use certledger_shared::{
    BatchConfig, CertLedgerError, DocumentReport, ExportConfig, LedgerRunId, MergedRow, Result,
    Roster,
};
use certledger_storage::{LedgerRun, Storage};

/// Where the roster for a run comes from.
#[derive(Debug, Clone)]
pub enum RosterSource {
    /// A headered CSV file with a `Name` column.
    Csv(PathBuf),
    /// The roster previously imported into the database at this path.
    Stored(PathBuf),
    /// No roster: every row is unmatched and no attribute columns are added.
    Empty,
}

/// Configuration for [`build_ledger`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Document files, in ledger order.
    pub documents: Vec<PathBuf>,
    /// Roster to reconcile against.
    pub roster: RosterSource,
    /// Ledger CSV destination; nothing is written when `None`.
    pub output_path: Option<PathBuf>,
    /// Database to record the run in; not persisted when `None`.
    pub db_path: Option<PathBuf>,
    pub batch: BatchConfig,
    pub export: ExportConfig,
}

/// Result of [`build_ledger`].
#[derive(Debug)]
pub struct LedgerSummary {
    /// Set when the run was persisted.
    pub run_id: Option<LedgerRunId>,
    /// Roster attribute columns carried by each row.
    pub columns: Vec<String>,
    /// The merged ledger, one row per extracted record.
    pub rows: Vec<MergedRow>,
    /// Per-document outcomes, in document order.
    pub documents: Vec<DocumentReport>,
    pub matched: usize,
    pub unmatched: usize,
    /// Duplicate roster names resolved by first-match.
    pub ambiguous_names: Vec<String>,
    pub output_path: Option<PathBuf>,
    pub elapsed: Duration,
}

impl LedgerSummary {
    /// Documents that could not be read, as `(document, reason)`.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.documents
            .iter()
            .filter_map(|d| d.error.as_deref().map(|e| (d.document.as_str(), e)))
    }
}

/// Configuration for [`extract_records`].
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub documents: Vec<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub batch: BatchConfig,
    pub export: ExportConfig,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self) {}
}

/// Run the full ledger pipeline.
///
/// 1. Load the roster (a malformed roster fails here, before any document is read)
/// 2. Extract all documents, concurrently, in document order
/// 3. Left-join the records against the roster
/// 4. Write the ledger CSV
/// 5. Record the run in the database
#[instrument(skip_all, fields(documents = config.documents.len()))]
pub async fn build_ledger(
    config: &LedgerConfig,
    progress: &dyn ProgressReporter,
) -> Result<LedgerSummary> {
    let start = Instant::now();

    // --- Phase 1: Roster ---
    progress.phase("Loading roster");
    let roster = resolve_roster(&config.roster).await?;
    if roster.is_empty() {
        warn!("roster is empty, every row will be unmatched");
    }

    // --- Phase 2: Extraction ---
    progress.phase("Extracting certificates");
    let outcome = extract_all_concurrent(file_sources(&config.documents), &config.batch).await;
    let BatchOutcome {
        records, documents, ..
    } = outcome;

    // --- Phase 3: Reconciliation ---
    progress.phase("Cross-referencing roster");
    let Reconciliation {
        rows,
        matched,
        unmatched,
        ambiguous_names,
    } = reconcile_detailed(&records, &roster);

    // --- Phase 4: Export ---
    if let Some(path) = &config.output_path {
        progress.phase("Writing ledger");
        write_ledger_file(path, &rows, &roster.columns, &config.export)?;
    }

    // --- Phase 5: Persist ---
    let run_id = match &config.db_path {
        Some(db_path) => {
            progress.phase("Saving run");
            let run = LedgerRun {
                id: LedgerRunId::new(),
                created_at: chrono::Utc::now(),
                columns: roster.columns.clone(),
                rows: rows.clone(),
                documents: documents.clone(),
            };
            Storage::open(db_path).await?.record_run(&run).await?;
            Some(run.id)
        }
        None => None,
    };

    let summary = LedgerSummary {
        run_id,
        columns: roster.columns,
        rows,
        documents,
        matched,
        unmatched,
        ambiguous_names,
        output_path: config.output_path.clone(),
        elapsed: start.elapsed(),
    };

    info!(
        rows = summary.rows.len(),
        failed = summary.failures().count(),
        elapsed_ms = summary.elapsed.as_millis(),
        "ledger pipeline complete"
    );
    progress.done();

    Ok(summary)
}

/// Extract records without reconciliation, optionally writing them as CSV.
#[instrument(skip_all, fields(documents = config.documents.len()))]
pub async fn extract_records(
    config: &ExtractConfig,
    progress: &dyn ProgressReporter,
) -> Result<BatchOutcome> {
    progress.phase("Extracting certificates");
    let outcome = extract_all_concurrent(file_sources(&config.documents), &config.batch).await;

    if let Some(path) = &config.output_path {
        progress.phase("Writing records");
        let file = std::fs::File::create(path).map_err(|e| CertLedgerError::io(path, e))?;
        certledger_recon::write_records(
            &outcome.records,
            std::io::BufWriter::new(file),
            &config.export,
        )?;
        info!(path = %path.display(), records = outcome.records.len(), "wrote records");
    }

    progress.done();
    Ok(outcome)
}

/// Import a roster CSV into the database, replacing any previous roster.
/// Returns the number of contacts stored.
#[instrument(skip_all, fields(csv = %csv_path.display(), db = %db_path.display()))]
pub async fn import_roster(csv_path: &Path, db_path: &Path) -> Result<usize> {
    let roster = load_roster(csv_path)?;
    let storage = Storage::open(db_path).await?;
    storage.replace_roster(&roster).await?;
    Ok(roster.len())
}

async fn resolve_roster(source: &RosterSource) -> Result<Roster> {
    match source {
        RosterSource::Csv(path) => load_roster(path),
        RosterSource::Stored(db_path) => {
            let roster = Storage::open(db_path).await?.load_roster().await?;
            info!(db = %db_path.display(), contacts = roster.len(), "loaded stored roster");
            Ok(roster)
        }
        RosterSource::Empty => Ok(Roster::default()),
    }
}
