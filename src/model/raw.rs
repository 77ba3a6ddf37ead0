//! Raw note records as they appear in an exported archive.
//!
//! Field names follow the archive's camelCase JSON. Optional collections
//! default to empty, so an omitted `attachments` array and an explicit
//! `"attachments": []` deserialize to the same value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An as-exported note, after schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawNote {
    pub title: String,

    /// Plain text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// HTML variant of the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content_html: Option<String>,

    /// Creation time (Unix microseconds)
    pub created_timestamp_usec: i64,

    /// Last edit time (Unix microseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_edited_timestamp_usec: Option<i64>,

    #[serde(default)]
    pub is_trashed: bool,

    #[serde(default)]
    pub is_pinned: bool,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default)]
    pub color: NoteColor,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<RawAttachment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<RawAnnotation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list_content: Vec<ListItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<RawLabel>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sharees: Vec<Sharee>,
}

impl RawNote {
    /// Minimal note with only the required fields set.
    pub fn new(title: impl Into<String>, created_timestamp_usec: i64) -> Self {
        Self {
            title: title.into(),
            text_content: None,
            text_content_html: None,
            created_timestamp_usec,
            user_edited_timestamp_usec: None,
            is_trashed: false,
            is_pinned: false,
            is_archived: false,
            color: NoteColor::Default,
            attachments: Vec::new(),
            annotations: Vec::new(),
            list_content: Vec::new(),
            labels: Vec::new(),
            sharees: Vec::new(),
        }
    }

    /// Creation time, if the timestamp is representable.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.created_timestamp_usec)
    }

    /// Last edit time, if present and representable.
    #[must_use]
    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.user_edited_timestamp_usec
            .and_then(DateTime::from_timestamp_micros)
    }

    /// HTML body, when present and not blank.
    #[must_use]
    pub fn html_body(&self) -> Option<&str> {
        self.text_content_html
            .as_deref()
            .filter(|html| !html.trim().is_empty())
    }

    /// True when the exporting account owns this shared note.
    #[must_use]
    pub fn is_shared_by_owner(&self) -> bool {
        self.sharees.iter().any(|s| s.is_owner)
    }

    /// True when the note was shared with the exporting account by someone else.
    #[must_use]
    pub fn is_received(&self) -> bool {
        !self.sharees.is_empty() && self.sharees.iter().all(|s| !s.is_owner)
    }
}

/// Note background color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteColor {
    #[default]
    Default,
    Red,
    Orange,
    Yellow,
    Green,
    Teal,
    Blue,
    Cerulean,
    Purple,
    Pink,
    Brown,
    Gray,
}

impl NoteColor {
    pub const ALL: [Self; 12] = [
        Self::Default,
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Teal,
        Self::Blue,
        Self::Cerulean,
        Self::Purple,
        Self::Pink,
        Self::Brown,
        Self::Gray,
    ];

    /// Archive spelling (`"RED"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Red => "RED",
            Self::Orange => "ORANGE",
            Self::Yellow => "YELLOW",
            Self::Green => "GREEN",
            Self::Teal => "TEAL",
            Self::Blue => "BLUE",
            Self::Cerulean => "CERULEAN",
            Self::Purple => "PURPLE",
            Self::Pink => "PINK",
            Self::Brown => "BROWN",
            Self::Gray => "GRAY",
        }
    }

    /// Title-cased label text (`"Red"`).
    #[must_use]
    pub fn label(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
            None => String::new(),
        }
    }
}

/// An image file attached to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawAttachment {
    pub file_path: String,
    pub mimetype: String,
}

/// Kind of a reference link annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnotationSource {
    Weblink,
    Sheets,
    Docs,
    Gmail,
}

impl AnnotationSource {
    pub const ALL: [Self; 4] = [Self::Weblink, Self::Sheets, Self::Docs, Self::Gmail];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Weblink => "WEBLINK",
            Self::Sheets => "SHEETS",
            Self::Docs => "DOCS",
            Self::Gmail => "GMAIL",
        }
    }
}

/// A reference link attached to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawAnnotation {
    pub source: AnnotationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One checklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListItem {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_html: Option<String>,
    #[serde(default)]
    pub is_checked: bool,
}

/// A user-assigned label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLabel {
    pub name: String,
}

/// A sharing participant. Sharing detail is not carried downstream;
/// only the ownership flags drive the shared/received attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Sharee {
    #[serde(default)]
    pub is_owner: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_empty_arrays_are_identical() {
        let absent: RawNote =
            serde_json::from_str(r#"{"title":"A","createdTimestampUsec":1}"#).unwrap();
        let empty: RawNote = serde_json::from_str(
            r#"{"title":"A","createdTimestampUsec":1,"attachments":[],"annotations":[]}"#,
        )
        .unwrap();
        assert_eq!(absent, empty);
    }

    #[test]
    fn test_color_label() {
        assert_eq!(NoteColor::Red.label(), "Red");
        assert_eq!(NoteColor::Cerulean.label(), "Cerulean");
    }

    #[test]
    fn test_sharing_flags() {
        let mut note = RawNote::new("Shared", 1);
        assert!(!note.is_shared_by_owner());
        assert!(!note.is_received());

        note.sharees = vec![Sharee { is_owner: false, kind: Some("WRITER".into()), email: None }];
        assert!(note.is_received());
        assert!(!note.is_shared_by_owner());

        note.sharees.push(Sharee { is_owner: true, kind: None, email: None });
        assert!(note.is_shared_by_owner());
        assert!(!note.is_received());
    }

    #[test]
    fn test_blank_html_is_absent() {
        let mut note = RawNote::new("Html", 1);
        note.text_content_html = Some("   ".into());
        assert!(note.html_body().is_none());
    }
}
