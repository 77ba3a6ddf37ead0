//! Local SQLite destination.
//!
//! A destination directory holds `notes.db` (notes, attachments and files
//! tables) and a `files/` directory with the uploaded image bytes. Each
//! append runs in its own transaction, so a failed append leaves no rows
//! behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::file_name;
use crate::pipeline::reconcile::ExistingState;
use crate::storage::schema::apply_schema;
use crate::storage::{AttachmentRow, Destination, DestinationResult, FileRef, NoteRow};

/// Database file inside the destination directory.
pub const DB_FILE: &str = "notes.db";

/// Directory for uploaded files inside the destination directory.
pub const FILES_DIR: &str = "files";

/// SQLite-backed destination.
#[derive(Debug)]
pub struct SqliteDestination {
    conn: Connection,
    root: PathBuf,
}

/// Row counts at the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DestinationCounts {
    pub notes: usize,
    pub attachments: usize,
    pub files: usize,
}

impl SqliteDestination {
    /// Open (or create) the destination in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the database
    /// cannot be opened, or the schema fails to apply.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir.join(FILES_DIR))?;

        let conn = Connection::open(dir.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_schema(&conn)?;

        debug!(path = %dir.display(), "opened destination");
        Ok(Self {
            conn,
            root: dir.to_path_buf(),
        })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Destination directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Count rows in each table.
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails.
    pub fn counts(&self) -> Result<DestinationCounts> {
        let count = |table: &str| -> rusqlite::Result<usize> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| usize::try_from(n).unwrap_or(0))
        };

        Ok(DestinationCounts {
            notes: count("notes")?,
            attachments: count("attachments")?,
            files: count("files")?,
        })
    }

    /// Delete every row and every uploaded file.
    ///
    /// Returns what was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows or files cannot be deleted.
    pub fn wipe(&mut self) -> Result<DestinationCounts> {
        let before = self.counts()?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM attachments", [])?;
        tx.execute("DELETE FROM notes", [])?;
        tx.execute("DELETE FROM files", [])?;
        tx.commit()?;

        let files_dir = self.root.join(FILES_DIR);
        if files_dir.exists() {
            std::fs::remove_dir_all(&files_dir)?;
        }
        std::fs::create_dir_all(&files_dir)?;

        info!(
            notes = before.notes,
            attachments = before.attachments,
            files = before.files,
            "wiped destination"
        );
        Ok(before)
    }
}

impl Destination for SqliteDestination {
    fn snapshot_existing_state(&self) -> DestinationResult<ExistingState> {
        let mut state = ExistingState::new();

        let mut stmt = self.conn.prepare(r#"SELECT "ID" FROM notes"#)?;
        let ids = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for id in ids {
            state.record_note(&id?);
        }

        let mut stmt = self.conn.prepare(r#"SELECT "Note", "ID" FROM attachments"#)?;
        let pairs = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for pair in pairs {
            let (note_id, attachment_id) = pair?;
            state.record_attachment(&note_id, &attachment_id);
        }

        Ok(state)
    }

    fn existing_file_names(&self) -> DestinationResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM files")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(names)
    }

    fn append_note_rows(&mut self, rows: &[NoteRow]) -> DestinationResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().timestamp_millis();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO notes ("ID", "Title", "Text", "Labels", "Created Date",
                                      "Modified Date", attachment_count, imported_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            )?;
            for row in rows {
                stmt.execute(params![
                    row.id,
                    row.title,
                    row.text,
                    row.labels,
                    row.created_date,
                    row.modified_date,
                    i64::try_from(row.attachment_count).unwrap_or(i64::MAX),
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn append_attachment_rows(&mut self, rows: &[AttachmentRow]) -> DestinationResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().timestamp_millis();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO attachments ("ID", "Note", "File", "Type", "Title", imported_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            )?;
            for row in rows {
                stmt.execute(params![row.id, row.note_id, row.file, row.kind, row.title, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn upload_attachment_file(
        &mut self,
        bytes: &[u8],
        display_name: &str,
    ) -> DestinationResult<FileRef> {
        let file_ref = uuid::Uuid::new_v4().to_string();
        let name = file_name(display_name);
        let relative = format!("{FILES_DIR}/{file_ref}-{name}");
        let absolute = self.root.join(&relative);

        std::fs::write(&absolute, bytes)?;

        let inserted = self.conn.execute(
            "INSERT INTO files (ref, name, stored_path, size, uploaded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                file_ref,
                name,
                relative,
                i64::try_from(bytes.len()).unwrap_or(i64::MAX),
                chrono::Utc::now().timestamp_millis(),
            ],
        );
        if let Err(err) = inserted {
            let _ = std::fs::remove_file(&absolute);
            return Err(err.into());
        }

        debug!(name, file_ref = %file_ref, size = bytes.len(), "uploaded file");
        Ok(FileRef(file_ref))
    }
}
