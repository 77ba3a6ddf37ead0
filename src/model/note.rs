//! Processed notes: the normalized, destination-ready form of a raw note.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A note after attribute processing.
///
/// Built once by the processor and only read afterwards; the identifier is
/// derived from the note's stable fields, so every run computes the same id
/// for the same source note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedNote {
    /// Stable identifier (16 hex chars)
    pub id: String,

    pub title: String,

    /// Body text: plain, HTML or a rendered checklist
    pub content: String,

    /// Ordered, deduplicated labels
    pub labels: Vec<String>,

    pub created: DateTime<Utc>,

    pub modified: Option<DateTime<Utc>>,

    /// Images and reference links, deduplicated by id
    pub attachments: Vec<AttachmentDescriptor>,

    /// Source record this note came from
    pub origin: String,
}

impl ProcessedNote {
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    /// Labels as a single destination cell.
    #[must_use]
    pub fn labels_joined(&self) -> String {
        self.labels.join(LABEL_SEPARATOR)
    }

    /// Image attachments, in note order.
    pub fn images(&self) -> impl Iterator<Item = &AttachmentDescriptor> {
        self.attachments
            .iter()
            .filter(|a| a.kind == AttachmentKind::Image)
    }
}

/// Separator used when labels share one cell.
pub const LABEL_SEPARATOR: &str = " , ";

/// What an attachment points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttachmentKind {
    Image,
    Link,
}

impl AttachmentKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Link => "Link",
        }
    }
}

/// An attachment belonging to a processed note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentDescriptor {
    /// Stable identifier derived from the owning note and `source`
    pub id: String,

    pub kind: AttachmentKind,

    /// File path inside the archive (images) or URL (links)
    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Display title: file name for images, annotation title or URL for links
    pub title: String,
}

impl AttachmentDescriptor {
    /// Last path component of the source, used as the stored file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        file_name(&self.source)
    }
}

/// Last component of a `/` or `\` separated path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("Keep/photo.png"), "photo.png");
        assert_eq!(file_name("photo.png"), "photo.png");
        assert_eq!(file_name(r"Keep\sub\photo.png"), "photo.png");
    }
}
