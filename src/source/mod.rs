//! Where raw note records come from.
//!
//! The pipeline reads through [`NoteSource`] and does not know which
//! concrete source is in use.

pub mod local;

pub use local::LocalSource;

use crate::error::Result;

/// One unparsed record and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// File name or index, used in diagnostics
    pub origin: String,
    pub bytes: Vec<u8>,
}

/// Lazy sequence of records.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<SourceRecord>> + 'a>;

/// A readable archive of exported notes.
pub trait NoteSource {
    /// Records in a stable order. Records are read lazily, so a limit on
    /// consumed records also limits I/O.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be listed. Per-record read
    /// failures are yielded by the iterator.
    fn records(&self) -> Result<RecordIter<'_>>;

    /// Bytes of an attachment referenced by a note, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read_attachment_bytes(&self, file_path: &str) -> Result<Option<Vec<u8>>>;
}
