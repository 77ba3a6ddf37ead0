//! Destination storage for imported notes.
//!
//! The pipeline writes through the [`Destination`] trait and never assumes
//! which backend sits behind it. Every operation may fail transiently, so
//! failures are reported as a [`DestinationError`] that carries its
//! retryability.
//!
//! # Submodules
//!
//! - [`schema`] - Table definitions for the SQLite destination
//! - [`sqlite`] - Local SQLite destination with a directory of uploaded files

pub mod schema;
pub mod sqlite;

pub use sqlite::{DestinationCounts, SqliteDestination};

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::model::{AttachmentDescriptor, ProcessedNote};
use crate::pipeline::reconcile::ExistingState;

/// Row timestamp format (UTC).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether retrying the same operation can succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rate limiting, lock contention, interrupted I/O
    Transient,
    /// Authorization, quota or shape problems
    Permanent,
}

/// A failed destination operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DestinationError {
    pub kind: FailureKind,
    pub message: String,
}

impl DestinationError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

impl From<rusqlite::Error> for DestinationError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        let transient = matches!(
            err.sqlite_error_code(),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        );
        Self {
            kind: if transient {
                FailureKind::Transient
            } else {
                FailureKind::Permanent
            },
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for DestinationError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let transient = matches!(
            err.kind(),
            ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
        );
        Self {
            kind: if transient {
                FailureKind::Transient
            } else {
                FailureKind::Permanent
            },
            message: err.to_string(),
        }
    }
}

pub type DestinationResult<T> = std::result::Result<T, DestinationError>;

/// One row of the notes table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRow {
    pub id: String,
    pub title: String,
    pub text: String,
    pub labels: String,
    pub created_date: String,
    pub modified_date: Option<String>,
    pub attachment_count: usize,
}

impl From<&ProcessedNote> for NoteRow {
    fn from(note: &ProcessedNote) -> Self {
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            text: note.content.clone(),
            labels: note.labels_joined(),
            created_date: note.created.format(DATE_FORMAT).to_string(),
            modified_date: note.modified.map(|m| m.format(DATE_FORMAT).to_string()),
            attachment_count: note.attachment_count(),
        }
    }
}

/// One row of the attachments table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRow {
    pub id: String,
    pub note_id: String,
    /// File name for images, URL for links
    pub file: String,
    /// `Image` or `Link`
    pub kind: String,
    pub title: String,
}

impl AttachmentRow {
    #[must_use]
    pub fn new(note: &ProcessedNote, attachment: &AttachmentDescriptor) -> Self {
        let file = match attachment.kind {
            crate::model::AttachmentKind::Image => attachment.file_name().to_string(),
            crate::model::AttachmentKind::Link => attachment.source.clone(),
        };
        Self {
            id: attachment.id.clone(),
            note_id: note.id.clone(),
            file,
            kind: attachment.kind.as_str().to_string(),
            title: attachment.title.clone(),
        }
    }
}

/// Reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef(pub String);

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where processed notes are written.
///
/// Appends are not idempotent on their own; callers reconcile against
/// [`Destination::snapshot_existing_state`] before writing.
pub trait Destination {
    /// Every note id with the attachment ids recorded for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be read.
    fn snapshot_existing_state(&self) -> DestinationResult<ExistingState>;

    /// Names of files already uploaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be read.
    fn existing_file_names(&self) -> DestinationResult<HashSet<String>>;

    /// Append note rows, all or none.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be written.
    fn append_note_rows(&mut self, rows: &[NoteRow]) -> DestinationResult<()>;

    /// Append attachment rows, all or none.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be written.
    fn append_attachment_rows(&mut self, rows: &[AttachmentRow]) -> DestinationResult<()>;

    /// Store a file under `display_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stored.
    fn upload_attachment_file(&mut self, bytes: &[u8], display_name: &str)
    -> DestinationResult<FileRef>;
}
