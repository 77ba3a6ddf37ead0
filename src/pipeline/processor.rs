//! Attribute processing: raw note in, processed note or skip signal out.
//!
//! The processor is a pure function of the raw note and the processing
//! config. It never touches the destination, so a note that errors or is
//! skipped here leaves no trace downstream.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::processing::{Attribute, ProcessingAction, ProcessingConfig};
use crate::error::{Error, Result};
use crate::model::{
    file_name, AttachmentDescriptor, AttachmentKind, ListItem, ProcessedNote, RawNote,
};
use crate::pipeline::hash::{attachment_id, note_id};
use crate::validate::{SchemaError, ViolationKind};

/// Checklist markers.
pub const CHECKED: char = '☑';
pub const UNCHECKED: char = '☐';

/// Result of processing one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The note goes to the destination.
    Imported {
        note: ProcessedNote,
        /// Attributes that were set but configured as `ignore`
        ignored: Vec<Attribute>,
    },
    /// The note was left out by a `skip` action.
    Skipped(SkipSignal),
}

/// Why a note was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipSignal {
    pub title: String,
    pub origin: String,
    pub reason: Attribute,
}

/// Apply the processing config to a validated note.
///
/// Attributes are evaluated in [`Attribute::ORDER`]; the first `skip` or
/// `error` action that applies decides the outcome.
///
/// # Errors
///
/// Returns `Error::ConfiguredAbort` if an attribute configured as `error`
/// is set on the note.
pub fn process(raw: &RawNote, config: &ProcessingConfig, origin: &str) -> Result<ProcessOutcome> {
    let mut labels = Vec::new();
    let mut ignored = Vec::new();

    for attribute in Attribute::ORDER {
        if !attribute.is_present(raw) {
            continue;
        }
        match config.actions.get(attribute) {
            // A checklist body replaces the HTML variant, so there is nothing to label.
            ProcessingAction::Label
                if attribute == Attribute::HtmlContent && !raw.list_content.is_empty() => {}
            ProcessingAction::Label => labels.push(config.labels.label_for(attribute, raw)),
            ProcessingAction::Ignore => ignored.push(attribute),
            ProcessingAction::Skip => {
                return Ok(ProcessOutcome::Skipped(SkipSignal {
                    title: raw.title.clone(),
                    origin: origin.to_string(),
                    reason: attribute,
                }));
            }
            ProcessingAction::Error => {
                return Err(Error::ConfiguredAbort {
                    attribute: attribute.as_str().to_string(),
                    title: raw.title.clone(),
                    origin: origin.to_string(),
                });
            }
        }
    }

    labels.extend(raw.labels.iter().map(|l| l.name.clone()));
    let labels = dedupe(labels, |label| label.clone());

    let created = raw.created_at().ok_or_else(|| {
        SchemaError::new(
            origin,
            "createdTimestampUsec",
            ViolationKind::InvalidValue,
            format!("timestamp {} is out of range", raw.created_timestamp_usec),
        )
    })?;

    let id = note_id(&raw.title, raw.created_timestamp_usec);
    let html_labeled = config.actions.get(Attribute::HtmlContent) == ProcessingAction::Label;

    let note = ProcessedNote {
        content: select_content(raw, html_labeled),
        attachments: describe_attachments(raw, &id),
        id,
        title: raw.title.clone(),
        labels,
        created,
        modified: raw.edited_at(),
        origin: origin.to_string(),
    };

    Ok(ProcessOutcome::Imported { note, ignored })
}

/// Body text for the note.
///
/// A checklist wins over everything, and the note then carries no HTML
/// label. HTML is used only when the `html_content` action is `label`;
/// otherwise the plain variant is used even if HTML exists.
fn select_content(raw: &RawNote, html_labeled: bool) -> String {
    if !raw.list_content.is_empty() {
        return render_checklist(&raw.list_content);
    }
    if html_labeled {
        if let Some(html) = raw.html_body() {
            return html.to_string();
        }
    }
    raw.text_content.clone().unwrap_or_default()
}

/// One line per non-empty item, prefixed with a checked/unchecked marker.
#[must_use]
pub fn render_checklist(items: &[ListItem]) -> String {
    items
        .iter()
        .filter(|item| !item.text.trim().is_empty())
        .map(|item| {
            let marker = if item.is_checked { CHECKED } else { UNCHECKED };
            format!("{marker} {}", item.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_attachments(raw: &RawNote, note_id: &str) -> Vec<AttachmentDescriptor> {
    let images = raw.attachments.iter().map(|a| AttachmentDescriptor {
        id: attachment_id(note_id, &a.file_path),
        kind: AttachmentKind::Image,
        title: file_name(&a.file_path).to_string(),
        source: a.file_path.clone(),
        mime_type: Some(a.mimetype.clone()),
    });

    let links = raw.annotations.iter().filter_map(|a| {
        let url = a.url.as_deref().filter(|u| !u.trim().is_empty())?;
        let title = a
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(url);
        Some(AttachmentDescriptor {
            id: attachment_id(note_id, url),
            kind: AttachmentKind::Link,
            source: url.to_string(),
            mime_type: None,
            title: title.to_string(),
        })
    });

    dedupe(images.chain(links).collect(), |a| a.id.clone())
}

/// Keep the first occurrence of each key, preserving order.
fn dedupe<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AnnotationSource, NoteColor, RawAnnotation, RawAttachment, RawLabel, Sharee,
    };

    const CREATED: i64 = 1_600_000_000_000_000;

    fn config_with(attribute: Attribute, action: ProcessingAction) -> ProcessingConfig {
        let mut config = ProcessingConfig::default();
        config.actions.set(attribute, action);
        config
    }

    /// A note with exactly one attribute set.
    fn note_with(attribute: Attribute) -> RawNote {
        let mut note = RawNote::new("Note", CREATED);
        note.text_content = Some("plain".into());
        match attribute {
            Attribute::Trashed => note.is_trashed = true,
            Attribute::Archived => note.is_archived = true,
            Attribute::Pinned => note.is_pinned = true,
            Attribute::Color => note.color = NoteColor::Blue,
            Attribute::HtmlContent => note.text_content_html = Some("<b>rich</b>".into()),
            Attribute::Shared => {
                note.sharees = vec![Sharee { is_owner: true, kind: None, email: None }];
            }
            Attribute::Received => {
                note.sharees = vec![Sharee { is_owner: false, kind: None, email: None }];
            }
        }
        note
    }

    fn imported(outcome: ProcessOutcome) -> (ProcessedNote, Vec<Attribute>) {
        match outcome {
            ProcessOutcome::Imported { note, ignored } => (note, ignored),
            ProcessOutcome::Skipped(s) => panic!("unexpected skip: {s:?}"),
        }
    }

    #[test]
    fn test_action_table_exhaustive() {
        let expected_labels = [
            (Attribute::Trashed, "Trashed"),
            (Attribute::Archived, "Archived"),
            (Attribute::Pinned, "Pinned"),
            (Attribute::Color, "Blue"),
            (Attribute::HtmlContent, "HTML"),
            (Attribute::Shared, "Shared"),
            (Attribute::Received, "Received"),
        ];

        for (attribute, label) in expected_labels {
            let raw = note_with(attribute);

            let (note, ignored) =
                imported(process(&raw, &config_with(attribute, ProcessingAction::Label), "n.json").unwrap());
            assert_eq!(note.labels, vec![label.to_string()], "{attribute} label");
            assert!(ignored.is_empty());

            let (note, ignored) =
                imported(process(&raw, &config_with(attribute, ProcessingAction::Ignore), "n.json").unwrap());
            assert!(note.labels.is_empty(), "{attribute} ignore adds no label");
            assert_eq!(ignored, vec![attribute]);

            match process(&raw, &config_with(attribute, ProcessingAction::Skip), "n.json").unwrap() {
                ProcessOutcome::Skipped(signal) => {
                    assert_eq!(signal.reason, attribute);
                    assert_eq!(signal.origin, "n.json");
                }
                ProcessOutcome::Imported { .. } => panic!("{attribute} should skip"),
            }

            let err = process(&raw, &config_with(attribute, ProcessingAction::Error), "n.json")
                .unwrap_err();
            match err {
                Error::ConfiguredAbort { attribute: name, title, .. } => {
                    assert_eq!(name, attribute.as_str());
                    assert_eq!(title, "Note");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_absent_attribute_never_acts() {
        let raw = RawNote::new("Plain", CREATED);
        for attribute in Attribute::ORDER {
            let config = config_with(attribute, ProcessingAction::Error);
            let (note, ignored) = imported(process(&raw, &config, "n.json").unwrap());
            assert!(note.labels.is_empty());
            assert!(ignored.is_empty());
        }
    }

    #[test]
    fn test_minimal_note() {
        let raw = RawNote::new("Minimal", CREATED);
        let (note, _) = imported(process(&raw, &ProcessingConfig::default(), "m.json").unwrap());
        assert_eq!(note.title, "Minimal");
        assert_eq!(note.content, "");
        assert!(note.labels.is_empty());
        assert!(note.attachments.is_empty());
        assert!(note.modified.is_none());
        assert_eq!(note.created.timestamp_micros(), CREATED);
    }

    #[test]
    fn test_default_config_skips_trashed() {
        let raw = note_with(Attribute::Trashed);
        let outcome = process(&raw, &ProcessingConfig::default(), "t.json").unwrap();
        assert!(matches!(
            outcome,
            ProcessOutcome::Skipped(SkipSignal { reason: Attribute::Trashed, .. })
        ));
    }

    #[test]
    fn test_html_used_only_when_labeled() {
        let raw = note_with(Attribute::HtmlContent);

        let (note, _) =
            imported(process(&raw, &config_with(Attribute::HtmlContent, ProcessingAction::Label), "h").unwrap());
        assert_eq!(note.content, "<b>rich</b>");

        let (note, _) =
            imported(process(&raw, &config_with(Attribute::HtmlContent, ProcessingAction::Ignore), "h").unwrap());
        assert_eq!(note.content, "plain");
    }

    #[test]
    fn test_checklist_overrides_text() {
        let mut raw = RawNote::new("List", CREATED);
        raw.text_content = Some("ignored".into());
        raw.list_content = vec![
            ListItem { text: "milk".into(), text_html: None, is_checked: true },
            ListItem { text: "  ".into(), text_html: None, is_checked: false },
            ListItem { text: "eggs".into(), text_html: None, is_checked: false },
        ];
        let (note, _) = imported(process(&raw, &ProcessingConfig::default(), "l").unwrap());
        assert_eq!(note.content, "☑ milk\n☐ eggs");
    }

    #[test]
    fn test_checklist_with_html_gets_no_html_label() {
        let mut raw = note_with(Attribute::HtmlContent);
        raw.list_content = vec![ListItem { text: "milk".into(), text_html: None, is_checked: false }];

        let config = config_with(Attribute::HtmlContent, ProcessingAction::Label);
        let (note, ignored) = imported(process(&raw, &config, "h").unwrap());
        assert_eq!(note.content, "☐ milk");
        assert!(!note.labels.contains(&"HTML".to_string()));
        assert!(ignored.is_empty());

        let config = config_with(Attribute::HtmlContent, ProcessingAction::Error);
        assert!(matches!(process(&raw, &config, "h"), Err(Error::ConfiguredAbort { .. })));
    }

    #[test]
    fn test_labels_ordered_and_deduped() {
        let mut raw = RawNote::new("Labels", CREATED);
        raw.is_pinned = true;
        raw.color = NoteColor::Red;
        raw.labels = vec![
            RawLabel { name: "work".into() },
            RawLabel { name: "Pinned".into() },
            RawLabel { name: "work".into() },
        ];
        let (note, _) = imported(process(&raw, &ProcessingConfig::default(), "l").unwrap());
        assert_eq!(note.labels, vec!["Pinned", "Red", "work"]);
        assert_eq!(note.labels_joined(), "Pinned , Red , work");
    }

    #[test]
    fn test_shared_and_received_are_independent() {
        let mut raw = RawNote::new("Both", CREATED);
        raw.sharees = vec![Sharee { is_owner: true, kind: None, email: None }];
        let config = config_with(Attribute::Received, ProcessingAction::Error);
        let (note, _) = imported(process(&raw, &config, "s").unwrap());
        assert_eq!(note.labels, vec!["Shared"]);
    }

    #[test]
    fn test_identity_ignores_flags() {
        let plain = RawNote::new("Same", CREATED);
        let mut pinned = plain.clone();
        pinned.is_pinned = true;
        pinned.text_content = Some("edited".into());

        let (a, _) = imported(process(&plain, &ProcessingConfig::default(), "a").unwrap());
        let (b, _) = imported(process(&pinned, &ProcessingConfig::default(), "b").unwrap());
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_attachment_descriptors() {
        let mut raw = RawNote::new("Attachments", CREATED);
        raw.attachments = vec![
            RawAttachment { file_path: "img/photo.png".into(), mimetype: "image/png".into() },
            RawAttachment { file_path: "img/photo.png".into(), mimetype: "image/png".into() },
        ];
        raw.annotations = vec![
            RawAnnotation {
                source: AnnotationSource::Weblink,
                title: Some("Docs".into()),
                description: None,
                url: Some("https://example.com/docs".into()),
            },
            RawAnnotation {
                source: AnnotationSource::Gmail,
                title: None,
                description: None,
                url: Some("https://mail.example.com/1".into()),
            },
            RawAnnotation {
                source: AnnotationSource::Sheets,
                title: Some("No url".into()),
                description: None,
                url: None,
            },
        ];

        let (note, _) = imported(process(&raw, &ProcessingConfig::default(), "a").unwrap());
        assert_eq!(note.attachment_count(), 3);

        let image = &note.attachments[0];
        assert_eq!(image.kind, AttachmentKind::Image);
        assert_eq!(image.title, "photo.png");
        assert_eq!(image.id, attachment_id(&note.id, "img/photo.png"));

        assert_eq!(note.attachments[1].title, "Docs");
        assert_eq!(note.attachments[2].title, "https://mail.example.com/1");
        assert_eq!(note.attachments[2].kind, AttachmentKind::Link);
    }
}
