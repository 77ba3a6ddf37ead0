//! Data models for the importer.
//!
//! - `RawNote` and its parts: one exported note, as validated
//! - `ProcessedNote`: the normalized note written to the destination
//! - `AttachmentDescriptor`: an image or reference link of a processed note

pub mod note;
pub mod raw;

pub use note::{file_name, AttachmentDescriptor, AttachmentKind, ProcessedNote, LABEL_SEPARATOR};
pub use raw::{
    AnnotationSource, ListItem, NoteColor, RawAnnotation, RawAttachment, RawLabel, RawNote, Sharee,
};
