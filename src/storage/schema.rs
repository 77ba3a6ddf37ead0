//! Table definitions for the SQLite destination.
//!
//! Column names mirror the sheet layout the notes were historically
//! exported to, so the tables can be dumped to CSV without renaming.

use rusqlite::{Connection, Result};

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the destination database.
///
/// Dates are stored as `%Y-%m-%d %H:%M:%S` text (UTC), as they appear in
/// the exported sheets.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- Notes: one row per imported note
CREATE TABLE IF NOT EXISTS notes (
    "ID" TEXT PRIMARY KEY,
    "Title" TEXT NOT NULL,
    "Text" TEXT NOT NULL DEFAULT '',
    "Labels" TEXT NOT NULL DEFAULT '',
    "Created Date" TEXT NOT NULL,
    "Modified Date" TEXT,
    attachment_count INTEGER NOT NULL DEFAULT 0,
    imported_at INTEGER NOT NULL
);

-- Attachments: images and reference links, each linked to its note
CREATE TABLE IF NOT EXISTS attachments (
    "ID" TEXT NOT NULL,
    "Note" TEXT NOT NULL REFERENCES notes("ID") ON DELETE CASCADE,
    "File" TEXT NOT NULL,
    "Type" TEXT NOT NULL CHECK ("Type" IN ('Image', 'Link')),
    "Title" TEXT NOT NULL DEFAULT '',
    imported_at INTEGER NOT NULL,
    PRIMARY KEY ("Note", "ID")
);

CREATE INDEX IF NOT EXISTS idx_attachments_file ON attachments("File");

-- Files: uploaded image bytes, stored under files/
CREATE TABLE IF NOT EXISTS files (
    ref TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    stored_path TEXT NOT NULL,
    size INTEGER NOT NULL,
    uploaded_at INTEGER NOT NULL
);
"#;

/// Apply pragmas and create any missing tables.
///
/// # Errors
///
/// Returns an error if a pragma or statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}
