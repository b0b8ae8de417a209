//! libSQL storage layer for rosters and ledger run history.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the imported
//! contact roster and every persisted ledger run (merged rows plus the
//! per-document outcome of the batch that produced them).

mod migrations;

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use certledger_shared::{
    CertLedgerError, ContactRecord, DocumentReport, ExtractedRecord, LedgerRunId, MergedRow,
    Result, Roster,
};
use libsql::{Connection, Database, params};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// A completed ledger run, ready to persist.
#[derive(Debug, Clone)]
pub struct LedgerRun {
    pub id: LedgerRunId,
    pub created_at: DateTime<Utc>,
    /// Roster attribute columns the rows were merged against.
    pub columns: Vec<String>,
    pub rows: Vec<MergedRow>,
    pub documents: Vec<DocumentReport>,
}

/// Listing entry for a persisted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub document_count: usize,
    pub failed_count: usize,
    pub row_count: usize,
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CertLedgerError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CertLedgerError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Roster operations
    // -----------------------------------------------------------------------

    /// Replace the stored roster with `roster`, keeping row and column order.
    pub async fn replace_roster(&self, roster: &Roster) -> Result<()> {
        let tx = self.conn.transaction().await.map_err(storage_err)?;

        tx.execute_batch("DELETE FROM roster_columns; DELETE FROM roster_contacts;")
            .await
            .map_err(storage_err)?;

        for (position, column) in roster.columns.iter().enumerate() {
            tx.execute(
                "INSERT INTO roster_columns (position, name) VALUES (?1, ?2)",
                params![position as i64, column.as_str()],
            )
            .await
            .map_err(storage_err)?;
        }

        for (position, contact) in roster.contacts.iter().enumerate() {
            let attributes = serde_json::to_string(&contact.attributes)
                .map_err(|e| CertLedgerError::Storage(e.to_string()))?;
            tx.execute(
                "INSERT INTO roster_contacts (position, name, attributes_json) VALUES (?1, ?2, ?3)",
                params![position as i64, contact.name.as_str(), attributes],
            )
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        tracing::info!(contacts = roster.len(), "stored roster");
        Ok(())
    }

    /// Load the stored roster. Empty if none was imported.
    pub async fn load_roster(&self) -> Result<Roster> {
        let mut rows = self
            .conn
            .query("SELECT name FROM roster_columns ORDER BY position", params![])
            .await
            .map_err(storage_err)?;

        let mut columns = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            columns.push(row.get::<String>(0).map_err(storage_err)?);
        }

        let mut rows = self
            .conn
            .query(
                "SELECT name, attributes_json FROM roster_contacts ORDER BY position",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut contacts = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let name = row.get::<String>(0).map_err(storage_err)?;
            let json = row.get::<String>(1).map_err(storage_err)?;
            let attributes: HashMap<String, String> = serde_json::from_str(&json)
                .map_err(|e| CertLedgerError::Storage(format!("invalid roster attributes: {e}")))?;
            contacts.push(ContactRecord { name, attributes });
        }

        Ok(Roster::new(columns, contacts))
    }

    // -----------------------------------------------------------------------
    // Ledger run operations
    // -----------------------------------------------------------------------

    /// Persist a run with its merged rows and document outcomes.
    pub async fn record_run(&self, run: &LedgerRun) -> Result<()> {
        let run_id = run.id.to_string();
        let failed = run.documents.iter().filter(|d| d.is_failed()).count();
        let columns_json = serde_json::to_string(&run.columns)
            .map_err(|e| CertLedgerError::Storage(e.to_string()))?;

        let tx = self.conn.transaction().await.map_err(storage_err)?;

        tx.execute(
            "INSERT INTO ledger_runs (id, created_at, document_count, failed_count, row_count, columns_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id.as_str(),
                run.created_at.to_rfc3339(),
                run.documents.len() as i64,
                failed as i64,
                run.rows.len() as i64,
                columns_json,
            ],
        )
        .await
        .map_err(storage_err)?;

        for (position, row) in run.rows.iter().enumerate() {
            let attributes = serde_json::to_string(&row.attributes)
                .map_err(|e| CertLedgerError::Storage(e.to_string()))?;
            tx.execute(
                "INSERT INTO ledger_rows
                   (run_id, position, name, certificate_number, issue_date, course_code, attributes_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run_id.as_str(),
                    position as i64,
                    row.record.name.as_deref(),
                    row.record.certificate_number.as_deref(),
                    row.record.issue_date.as_deref(),
                    row.record.course_code.as_str(),
                    attributes,
                ],
            )
            .await
            .map_err(storage_err)?;
        }

        for (position, doc) in run.documents.iter().enumerate() {
            tx.execute(
                "INSERT INTO run_documents (run_id, position, document, fingerprint, record_count, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id.as_str(),
                    position as i64,
                    doc.document.as_str(),
                    doc.fingerprint.as_deref(),
                    doc.record_count as i64,
                    doc.error.as_deref(),
                ],
            )
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        tracing::info!(run_id = %run.id, rows = run.rows.len(), "recorded ledger run");
        Ok(())
    }

    /// List persisted runs, newest first.
    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, created_at, document_count, failed_count, row_count
                 FROM ledger_runs ORDER BY created_at DESC, id DESC",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let created_at: String = row.get(1).map_err(storage_err)?;
            results.push(RunSummary {
                id: row.get::<String>(0).map_err(storage_err)?,
                created_at: parse_timestamp(&created_at)?,
                document_count: row.get::<i64>(2).map_err(storage_err)? as usize,
                failed_count: row.get::<i64>(3).map_err(storage_err)? as usize,
                row_count: row.get::<i64>(4).map_err(storage_err)? as usize,
            });
        }
        Ok(results)
    }

    /// Merged rows of a run, in ledger order.
    pub async fn ledger_rows(&self, run_id: &str) -> Result<Vec<MergedRow>> {
        let mut rows = self
            .conn
            .query(
                "SELECT name, certificate_number, issue_date, course_code, attributes_json
                 FROM ledger_rows WHERE run_id = ?1 ORDER BY position",
                params![run_id],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let json = row.get::<String>(4).map_err(storage_err)?;
            let attributes: Vec<(String, String)> = serde_json::from_str(&json)
                .map_err(|e| CertLedgerError::Storage(format!("invalid row attributes: {e}")))?;
            results.push(MergedRow {
                record: ExtractedRecord {
                    name: row.get::<String>(0).ok(),
                    certificate_number: row.get::<String>(1).ok(),
                    issue_date: row.get::<String>(2).ok(),
                    course_code: row.get::<String>(3).map_err(storage_err)?,
                },
                attributes,
            });
        }
        Ok(results)
    }

    /// Roster columns a run was merged against.
    pub async fn run_columns(&self, run_id: &str) -> Result<Option<Vec<String>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT columns_json FROM ledger_runs WHERE id = ?1",
                params![run_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json = row.get::<String>(0).map_err(storage_err)?;
                let columns = serde_json::from_str(&json).map_err(|e| {
                    CertLedgerError::Storage(format!("invalid run columns: {e}"))
                })?;
                Ok(Some(columns))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Per-document outcomes of a run, in batch order.
    pub async fn run_documents(&self, run_id: &str) -> Result<Vec<DocumentReport>> {
        let mut rows = self
            .conn
            .query(
                "SELECT document, fingerprint, record_count, error
                 FROM run_documents WHERE run_id = ?1 ORDER BY position",
                params![run_id],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(DocumentReport {
                document: row.get::<String>(0).map_err(storage_err)?,
                fingerprint: row.get::<String>(1).ok(),
                record_count: row.get::<i64>(2).map_err(storage_err)? as usize,
                error: row.get::<String>(3).ok(),
            });
        }
        Ok(results)
    }
}

fn storage_err(e: libsql::Error) -> CertLedgerError {
    CertLedgerError::Storage(e.to_string())
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CertLedgerError::Storage(format!("invalid date: {e}")))
}
