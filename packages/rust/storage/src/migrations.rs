//! SQL migration definitions for the certledger database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: roster, ledger runs, ledger rows, run documents",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Roster attribute columns, in source header order
CREATE TABLE IF NOT EXISTS roster_columns (
    position INTEGER PRIMARY KEY,
    name     TEXT NOT NULL
);

-- Roster contacts, in source row order (names may repeat)
CREATE TABLE IF NOT EXISTS roster_contacts (
    position        INTEGER PRIMARY KEY,
    name            TEXT NOT NULL,
    attributes_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_roster_contacts_name ON roster_contacts(name);

-- One row per processed batch
CREATE TABLE IF NOT EXISTS ledger_runs (
    id             TEXT PRIMARY KEY,
    created_at     TEXT NOT NULL,
    document_count INTEGER NOT NULL,
    failed_count   INTEGER NOT NULL,
    row_count      INTEGER NOT NULL,
    columns_json   TEXT NOT NULL
);

-- Merged ledger rows per run
CREATE TABLE IF NOT EXISTS ledger_rows (
    run_id             TEXT NOT NULL REFERENCES ledger_runs(id) ON DELETE CASCADE,
    position           INTEGER NOT NULL,
    name               TEXT,
    certificate_number TEXT,
    issue_date         TEXT,
    course_code        TEXT NOT NULL,
    attributes_json    TEXT NOT NULL,
    PRIMARY KEY (run_id, position)
);

CREATE INDEX IF NOT EXISTS idx_ledger_rows_course ON ledger_rows(course_code);

-- Per-document outcome per run
CREATE TABLE IF NOT EXISTS run_documents (
    run_id       TEXT NOT NULL REFERENCES ledger_runs(id) ON DELETE CASCADE,
    position     INTEGER NOT NULL,
    document     TEXT NOT NULL,
    fingerprint  TEXT,
    record_count INTEGER NOT NULL,
    error        TEXT,
    PRIMARY KEY (run_id, position)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
