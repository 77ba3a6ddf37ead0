//! Per-attribute processing rules.
//!
//! Each optional note attribute maps to one of four actions. Attributes are
//! always evaluated in [`Attribute::ORDER`], which also fixes the order of
//! the labels they produce.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::RawNote;

/// An optional note attribute the processor can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Trashed,
    Archived,
    Pinned,
    Color,
    HtmlContent,
    Shared,
    Received,
}

impl Attribute {
    /// Evaluation order.
    pub const ORDER: [Self; 7] = [
        Self::Trashed,
        Self::Archived,
        Self::Pinned,
        Self::Color,
        Self::HtmlContent,
        Self::Shared,
        Self::Received,
    ];

    /// Config key and skip-reason tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trashed => "trashed",
            Self::Archived => "archived",
            Self::Pinned => "pinned",
            Self::Color => "color",
            Self::HtmlContent => "html_content",
            Self::Shared => "shared",
            Self::Received => "received",
        }
    }

    /// Whether the attribute is set on this note.
    ///
    /// A `DEFAULT` color and a blank HTML body count as unset.
    #[must_use]
    pub fn is_present(&self, note: &RawNote) -> bool {
        match self {
            Self::Trashed => note.is_trashed,
            Self::Archived => note.is_archived,
            Self::Pinned => note.is_pinned,
            Self::Color => note.color != crate::model::NoteColor::Default,
            Self::HtmlContent => note.html_body().is_some(),
            Self::Shared => note.is_shared_by_owner(),
            Self::Received => note.is_received(),
        }
    }

    /// Action used when the config does not name this attribute.
    #[must_use]
    pub const fn default_action(&self) -> ProcessingAction {
        match self {
            Self::Trashed | Self::Archived => ProcessingAction::Skip,
            Self::HtmlContent => ProcessingAction::Ignore,
            Self::Pinned | Self::Color | Self::Shared | Self::Received => ProcessingAction::Label,
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a note that has an attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingAction {
    /// Import the note and add a label for the attribute.
    Label,
    /// Abort the run.
    Error,
    /// Leave the note out, recording the attribute as the reason.
    Skip,
    /// Import the note as if the attribute were unset.
    Ignore,
}

impl ProcessingAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Error => "error",
            Self::Skip => "skip",
            Self::Ignore => "ignore",
        }
    }
}

/// Attribute → action table. Attributes left out fall back to their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTable(BTreeMap<Attribute, ProcessingAction>);

impl ActionTable {
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> ProcessingAction {
        self.0
            .get(&attribute)
            .copied()
            .unwrap_or_else(|| attribute.default_action())
    }

    pub fn set(&mut self, attribute: Attribute, action: ProcessingAction) {
        self.0.insert(attribute, action);
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self(
            Attribute::ORDER
                .iter()
                .map(|a| (*a, a.default_action()))
                .collect(),
        )
    }
}

/// Display names for the labels attributes produce.
///
/// Colors label with their own title-cased name, so there is no entry here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelNames {
    pub trashed: String,
    pub archived: String,
    pub pinned: String,
    pub shared: String,
    pub received: String,
    pub html: String,
}

impl Default for LabelNames {
    fn default() -> Self {
        Self {
            trashed: "Trashed".into(),
            archived: "Archived".into(),
            pinned: "Pinned".into(),
            shared: "Shared".into(),
            received: "Received".into(),
            html: "HTML".into(),
        }
    }
}

impl LabelNames {
    /// Label text for an attribute present on `note`.
    #[must_use]
    pub fn label_for(&self, attribute: Attribute, note: &RawNote) -> String {
        match attribute {
            Attribute::Trashed => self.trashed.clone(),
            Attribute::Archived => self.archived.clone(),
            Attribute::Pinned => self.pinned.clone(),
            Attribute::Color => note.color.label(),
            Attribute::HtmlContent => self.html.clone(),
            Attribute::Shared => self.shared.clone(),
            Attribute::Received => self.received.clone(),
        }
    }
}

/// Everything the attribute processor needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingConfig {
    pub actions: ActionTable,
    pub labels: LabelNames,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = ActionTable::default();
        assert_eq!(table.get(Attribute::Color), ProcessingAction::Label);
        assert_eq!(table.get(Attribute::Trashed), ProcessingAction::Skip);
        assert_eq!(table.get(Attribute::Archived), ProcessingAction::Skip);
        assert_eq!(table.get(Attribute::Pinned), ProcessingAction::Label);
        assert_eq!(table.get(Attribute::HtmlContent), ProcessingAction::Ignore);
        assert_eq!(table.get(Attribute::Shared), ProcessingAction::Label);
        assert_eq!(table.get(Attribute::Received), ProcessingAction::Label);
    }

    #[test]
    fn test_partial_table_falls_back() {
        let table: ActionTable = serde_json::from_str(r#"{"pinned":"error"}"#).unwrap();
        assert_eq!(table.get(Attribute::Pinned), ProcessingAction::Error);
        assert_eq!(table.get(Attribute::Trashed), ProcessingAction::Skip);
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(serde_json::from_str::<ActionTable>(r#"{"pinned":"drop"}"#).is_err());
        assert!(serde_json::from_str::<ActionTable>(r#"{"starred":"label"}"#).is_err());
    }
}
