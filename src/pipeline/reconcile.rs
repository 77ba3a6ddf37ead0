//! Reconciliation: compare processed notes with what the destination holds.
//!
//! Classification is per note and depends only on the note and the existing
//! state, never on other notes in the batch, so batch order does not change
//! the result.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::model::{AttachmentDescriptor, ProcessedNote};

/// Note ids present at the destination, each with its attachment ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingState {
    notes: HashMap<String, HashSet<String>>,
}

impl ExistingState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a note row.
    pub fn record_note(&mut self, note_id: &str) {
        self.notes.entry(note_id.to_string()).or_default();
    }

    /// Record an attachment row; also records its note.
    pub fn record_attachment(&mut self, note_id: &str, attachment_id: &str) {
        self.notes
            .entry(note_id.to_string())
            .or_default()
            .insert(attachment_id.to_string());
    }

    /// Record a note and all of its attachments.
    pub fn record(&mut self, note: &ProcessedNote) {
        let entry = self.notes.entry(note.id.clone()).or_default();
        entry.extend(note.attachments.iter().map(|a| a.id.clone()));
    }

    #[must_use]
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.notes.values().map(HashSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Read access to existing notes and attachments.
pub trait KnownAttachments {
    fn has_note(&self, note_id: &str) -> bool;
    fn has_attachment(&self, note_id: &str, attachment_id: &str) -> bool;
}

impl KnownAttachments for ExistingState {
    fn has_note(&self, note_id: &str) -> bool {
        self.notes.contains_key(note_id)
    }

    fn has_attachment(&self, note_id: &str, attachment_id: &str) -> bool {
        self.notes
            .get(note_id)
            .is_some_and(|ids| ids.contains(attachment_id))
    }
}

/// Two states viewed as their union: the run-start snapshot and what the
/// current run has written so far.
pub struct Layered<'a> {
    pub base: &'a ExistingState,
    pub session: &'a ExistingState,
}

impl KnownAttachments for Layered<'_> {
    fn has_note(&self, note_id: &str) -> bool {
        self.base.has_note(note_id) || self.session.has_note(note_id)
    }

    fn has_attachment(&self, note_id: &str, attachment_id: &str) -> bool {
        self.base.has_attachment(note_id, attachment_id)
            || self.session.has_attachment(note_id, attachment_id)
    }
}

/// A note that exists but lacks some attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<'a> {
    pub note: &'a ProcessedNote,
    pub missing: Vec<&'a AttachmentDescriptor>,
}

/// The three-way split of a batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcilePlan<'a> {
    /// Not at the destination: write the row and all attachments
    pub to_create: Vec<&'a ProcessedNote>,
    /// At the destination with missing attachments: write only those
    pub to_complete: Vec<Completion<'a>>,
    /// Fully present: write nothing
    pub duplicates: Vec<&'a ProcessedNote>,
}

impl<'a> ReconcilePlan<'a> {
    /// Every note in the plan, whatever its class.
    pub fn all_notes(&self) -> impl Iterator<Item = &'a ProcessedNote> + '_ {
        self.to_create
            .iter()
            .copied()
            .chain(self.to_complete.iter().map(|c| c.note))
            .chain(self.duplicates.iter().copied())
    }

    /// Attachment rows this plan will append, paired with their note.
    pub fn attachments_to_write(
        &self,
    ) -> impl Iterator<Item = (&'a ProcessedNote, &'a AttachmentDescriptor)> + '_ {
        let created = self
            .to_create
            .iter()
            .flat_map(|&note| note.attachments.iter().map(move |a| (note, a)));
        let completed = self
            .to_complete
            .iter()
            .flat_map(|c| c.missing.iter().map(move |a| (c.note, *a)));
        created.chain(completed)
    }
}

/// Classify a batch against the existing state.
pub fn classify<'a>(notes: &'a [ProcessedNote], existing: &impl KnownAttachments) -> ReconcilePlan<'a> {
    let mut plan = ReconcilePlan::default();

    for note in notes {
        if !existing.has_note(&note.id) {
            debug!(note = %note.id, "new note");
            plan.to_create.push(note);
            continue;
        }

        let missing: Vec<_> = note
            .attachments
            .iter()
            .filter(|a| !existing.has_attachment(&note.id, &a.id))
            .collect();

        if missing.is_empty() {
            debug!(note = %note.id, "duplicate note");
            plan.duplicates.push(note);
        } else {
            debug!(note = %note.id, missing = missing.len(), "incomplete note");
            plan.to_complete.push(Completion { note, missing });
        }
    }

    plan
}
