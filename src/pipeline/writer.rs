//! Batch writer: stages processed notes and flushes them in batches.
//!
//! Each flush classifies the batch against the run-start snapshot plus
//! everything this run already wrote, then writes in a fixed order:
//!
//! 1. note rows for new notes
//! 2. image files not yet stored at the destination
//! 3. attachment rows for new notes and missing attachments of existing ones
//!
//! A note row therefore always exists before any attachment that references
//! it, and an interrupted run leaves at worst notes with missing
//! attachments, which the next run backfills.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::Result;
use crate::model::ProcessedNote;
use crate::pipeline::reconcile::{classify, ExistingState, Layered, ReconcilePlan};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::types::ImportStats;
use crate::source::NoteSource;
use crate::storage::{AttachmentRow, Destination, NoteRow};

/// Knobs for a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterSettings {
    pub batch_size: usize,
    pub import_images: bool,
    pub retry: RetryPolicy,
}

pub struct BatchWriter<'a> {
    destination: &'a mut dyn Destination,
    source: &'a dyn NoteSource,
    settings: WriterSettings,
    /// Destination state at run start; never updated
    snapshot: ExistingState,
    /// What this run has written
    session: ExistingState,
    known_files: HashSet<String>,
    missing_files: HashSet<String>,
    pending: Vec<ProcessedNote>,
    pending_ids: HashSet<String>,
}

impl<'a> BatchWriter<'a> {
    /// Snapshot the destination and start an empty batch.
    ///
    /// # Errors
    ///
    /// Returns a write error if the destination cannot be read.
    pub fn begin(
        destination: &'a mut dyn Destination,
        source: &'a dyn NoteSource,
        settings: WriterSettings,
    ) -> Result<Self> {
        let retry = settings.retry;
        let snapshot = retry.run("snapshot_existing_state", String::new, || {
            destination.snapshot_existing_state()
        })?;
        let known_files =
            retry.run("existing_file_names", String::new, || destination.existing_file_names())?;

        info!(
            notes = snapshot.note_count(),
            attachments = snapshot.attachment_count(),
            files = known_files.len(),
            "destination snapshot"
        );

        Ok(Self {
            destination,
            source,
            settings,
            snapshot,
            session: ExistingState::new(),
            known_files,
            missing_files: HashSet::new(),
            pending: Vec::new(),
            pending_ids: HashSet::new(),
        })
    }

    /// Destination state at run start.
    #[must_use]
    pub fn snapshot(&self) -> &ExistingState {
        &self.snapshot
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Add a note to the current batch, flushing when it is full.
    ///
    /// A note whose id is already pending flushes the batch first, so one
    /// batch never holds the same note twice.
    ///
    /// Returns how many batches were flushed.
    ///
    /// # Errors
    ///
    /// Returns a write error from a flush.
    pub fn stage(&mut self, note: ProcessedNote, stats: &mut ImportStats) -> Result<usize> {
        let mut flushed = 0;

        if self.pending_ids.contains(&note.id) {
            if let Err(err) = self.flush(stats) {
                // The incoming note never joined a batch.
                stats.errored += 1;
                return Err(err);
            }
            flushed += 1;
        }

        self.pending_ids.insert(note.id.clone());
        self.pending.push(note);

        if self.pending.len() >= self.settings.batch_size.max(1) {
            self.flush(stats)?;
            flushed += 1;
        }

        Ok(flushed)
    }

    /// Write the pending batch. Does nothing when the batch is empty.
    ///
    /// # Errors
    ///
    /// Returns a write error. New notes whose rows were not committed count
    /// as errored; notes whose row exists but whose attachments were not all
    /// written count as incomplete.
    pub fn flush(&mut self, stats: &mut ImportStats) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let notes = std::mem::take(&mut self.pending);
        self.pending_ids.clear();

        let plan = classify(
            &notes,
            &Layered {
                base: &self.snapshot,
                session: &self.session,
            },
        );

        if let Err(err) = self.write_note_rows(&plan, stats) {
            stats.errored += plan.to_create.len();
            stats.incomplete += plan.to_complete.len();
            return Err(err);
        }
        if let Err(err) = self.write_attachments(&plan, stats) {
            let created_with_attachments = plan
                .to_create
                .iter()
                .filter(|note| !note.attachments.is_empty())
                .count();
            stats.incomplete += created_with_attachments + plan.to_complete.len();
            return Err(err);
        }

        stats.duplicates += plan.duplicates.len();
        stats.batches += 1;

        info!(
            batch = stats.batches,
            notes = notes.len(),
            created = plan.to_create.len(),
            completed = plan.to_complete.len(),
            duplicates = plan.duplicates.len(),
            "flushed batch"
        );
        Ok(())
    }

    fn write_note_rows(&mut self, plan: &ReconcilePlan<'_>, stats: &mut ImportStats) -> Result<()> {
        let retry = self.settings.retry;

        let note_rows: Vec<NoteRow> = plan.to_create.iter().map(|n| NoteRow::from(*n)).collect();
        if !note_rows.is_empty() {
            let destination = &mut *self.destination;
            retry.run(
                "append_note_rows",
                || describe_notes(plan.to_create.iter().copied()),
                || destination.append_note_rows(&note_rows),
            )?;
            for note in &plan.to_create {
                self.session.record_note(&note.id);
            }
            stats.created += note_rows.len();
        }
        Ok(())
    }

    /// Image files, then attachment rows. Runs only once the batch's note
    /// rows are committed.
    fn write_attachments(&mut self, plan: &ReconcilePlan<'_>, stats: &mut ImportStats) -> Result<()> {
        let retry = self.settings.retry;

        if self.settings.import_images {
            for note in plan.all_notes() {
                self.sync_images(note, stats)?;
            }
        }

        let attachment_rows: Vec<AttachmentRow> = plan
            .attachments_to_write()
            .map(|(note, attachment)| AttachmentRow::new(note, attachment))
            .collect();
        if !attachment_rows.is_empty() {
            let destination = &mut *self.destination;
            retry.run(
                "append_attachment_rows",
                || describe_notes(plan.attachments_to_write().map(|(note, _)| note)),
                || destination.append_attachment_rows(&attachment_rows),
            )?;
            stats.attachments_written += attachment_rows.len();
        }

        for note in plan.to_create.iter().copied().chain(plan.to_complete.iter().map(|c| c.note)) {
            self.session.record(note);
        }
        stats.completed += plan.to_complete.len();

        Ok(())
    }

    /// Upload the note's images that the destination does not store yet.
    fn sync_images(&mut self, note: &ProcessedNote, stats: &mut ImportStats) -> Result<()> {
        let retry = self.settings.retry;

        for image in note.images() {
            let name = image.file_name();
            if self.known_files.contains(name) || self.missing_files.contains(name) {
                continue;
            }

            let Some(bytes) = self.source.read_attachment_bytes(&image.source)? else {
                warn!(note = %note.id, file = %image.source, "image file not found in source");
                self.missing_files.insert(name.to_string());
                stats.files_missing += 1;
                continue;
            };

            let destination = &mut *self.destination;
            let file_ref = retry.run(
                "upload_attachment_file",
                || format!("file {name} of note {}", note.id),
                || destination.upload_attachment_file(&bytes, name),
            )?;

            tracing::debug!(file = name, file_ref = %file_ref, "stored image");
            self.known_files.insert(name.to_string());
            stats.files_uploaded += 1;
        }

        Ok(())
    }
}

/// `notes <id> (<origin>), ...` for error context.
fn describe_notes<'n>(notes: impl Iterator<Item = &'n ProcessedNote>) -> String {
    let mut seen = HashSet::new();
    let parts: Vec<String> = notes
        .filter(|n| seen.insert(n.id.as_str()))
        .map(|n| format!("{} ({})", n.id, n.origin))
        .collect();
    format!("notes {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttachmentDescriptor, AttachmentKind};
    use crate::pipeline::hash::{attachment_id, note_id};
    use crate::source::RecordIter;
    use crate::error::Error;
    use crate::storage::{DestinationError, DestinationResult, FileRef};
    use chrono::DateTime;

    /// In-memory destination recording every call.
    #[derive(Default)]
    struct MemoryDestination {
        existing: ExistingState,
        calls: Vec<String>,
        note_rows: Vec<NoteRow>,
        attachment_rows: Vec<AttachmentRow>,
        files: HashSet<String>,
        fail_notes: bool,
        fail_attachments: bool,
    }

    impl Destination for MemoryDestination {
        fn snapshot_existing_state(&self) -> DestinationResult<ExistingState> {
            Ok(self.existing.clone())
        }

        fn existing_file_names(&self) -> DestinationResult<HashSet<String>> {
            Ok(self.files.clone())
        }

        fn append_note_rows(&mut self, rows: &[NoteRow]) -> DestinationResult<()> {
            self.calls.push(format!("notes:{}", rows.len()));
            if self.fail_notes {
                return Err(DestinationError::permanent("quota exceeded"));
            }
            self.note_rows.extend_from_slice(rows);
            Ok(())
        }

        fn append_attachment_rows(&mut self, rows: &[AttachmentRow]) -> DestinationResult<()> {
            self.calls.push(format!("attachments:{}", rows.len()));
            if self.fail_attachments {
                return Err(DestinationError::permanent("quota exceeded"));
            }
            self.attachment_rows.extend_from_slice(rows);
            Ok(())
        }

        fn upload_attachment_file(
            &mut self,
            _bytes: &[u8],
            display_name: &str,
        ) -> DestinationResult<FileRef> {
            self.calls.push(format!("upload:{display_name}"));
            self.files.insert(display_name.to_string());
            Ok(FileRef(display_name.to_string()))
        }
    }

    /// Source that has every attachment.
    struct AllFiles;

    impl NoteSource for AllFiles {
        fn records(&self) -> Result<RecordIter<'_>> {
            Ok(Box::new(std::iter::empty()))
        }

        fn read_attachment_bytes(&self, _file_path: &str) -> Result<Option<Vec<u8>>> {
            Ok(Some(b"img".to_vec()))
        }
    }

    fn settings(batch_size: usize) -> WriterSettings {
        WriterSettings {
            batch_size,
            import_images: true,
            retry: RetryPolicy::immediate(1),
        }
    }

    fn note(title: &str, images: &[&str]) -> ProcessedNote {
        let id = note_id(title, 1);
        ProcessedNote {
            attachments: images
                .iter()
                .map(|path| AttachmentDescriptor {
                    id: attachment_id(&id, path),
                    kind: AttachmentKind::Image,
                    source: (*path).to_string(),
                    mime_type: Some("image/png".into()),
                    title: (*path).to_string(),
                })
                .collect(),
            id,
            title: title.to_string(),
            content: String::new(),
            labels: Vec::new(),
            created: DateTime::from_timestamp_micros(1).unwrap(),
            modified: None,
            origin: format!("{title}.json"),
        }
    }

    #[test]
    fn test_note_rows_before_uploads_before_attachments() {
        let mut dest = MemoryDestination::default();
        let mut stats = ImportStats::default();
        {
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings(10)).unwrap();
            writer.stage(note("a", &["a.png"]), &mut stats).unwrap();
            writer.flush(&mut stats).unwrap();
        }
        assert_eq!(dest.calls, vec!["notes:1", "upload:a.png", "attachments:1"]);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.files_uploaded, 1);
        assert_eq!(stats.batches, 1);
    }

    #[test]
    fn test_batches_flush_at_size() {
        let mut dest = MemoryDestination::default();
        let mut stats = ImportStats::default();
        {
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings(2)).unwrap();
            assert_eq!(writer.stage(note("a", &[]), &mut stats).unwrap(), 0);
            assert_eq!(writer.stage(note("b", &[]), &mut stats).unwrap(), 1);
            assert_eq!(writer.stage(note("c", &[]), &mut stats).unwrap(), 0);
            assert_eq!(writer.pending_len(), 1);
            writer.flush(&mut stats).unwrap();
        }
        assert_eq!(stats.batches, 2);
        assert_eq!(dest.note_rows.len(), 3);
    }

    #[test]
    fn test_repeated_note_in_run_written_once() {
        let mut dest = MemoryDestination::default();
        let mut stats = ImportStats::default();
        {
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings(10)).unwrap();
            writer.stage(note("a", &["a.png"]), &mut stats).unwrap();
            let flushed = writer.stage(note("a", &["a.png"]), &mut stats).unwrap();
            assert_eq!(flushed, 1);
            writer.flush(&mut stats).unwrap();
        }
        assert_eq!(dest.note_rows.len(), 1);
        assert_eq!(dest.attachment_rows.len(), 1);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.files_uploaded, 1);
    }

    #[test]
    fn test_images_elided_when_disabled() {
        let mut dest = MemoryDestination::default();
        let mut stats = ImportStats::default();
        {
            let mut settings = settings(10);
            settings.import_images = false;
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings).unwrap();
            writer.stage(note("a", &["Keep/a.png"]), &mut stats).unwrap();
            writer.flush(&mut stats).unwrap();
        }
        assert_eq!(dest.calls, vec!["notes:1", "attachments:1"]);
        assert_eq!(dest.attachment_rows[0].file, "a.png");
        assert_eq!(stats.files_uploaded, 0);
    }

    #[test]
    fn test_duplicate_note_still_syncs_missing_image() {
        let existing_note = note("a", &["a.png"]);
        let mut dest = MemoryDestination::default();
        dest.existing.record(&existing_note);

        let mut stats = ImportStats::default();
        {
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings(10)).unwrap();
            writer.stage(existing_note, &mut stats).unwrap();
            writer.flush(&mut stats).unwrap();
        }
        assert_eq!(dest.calls, vec!["upload:a.png"]);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.files_uploaded, 1);
    }

    #[test]
    fn test_failed_note_rows_count_as_errored() {
        let mut dest = MemoryDestination {
            fail_notes: true,
            ..MemoryDestination::default()
        };
        let mut stats = ImportStats::default();
        {
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings(10)).unwrap();
            writer.stage(note("a", &["a.png"]), &mut stats).unwrap();
            writer.stage(note("b", &[]), &mut stats).unwrap();
            let result = writer.flush(&mut stats);
            assert!(matches!(result, Err(Error::PermanentWrite { .. })));
        }
        assert_eq!(dest.calls, vec!["notes:2"]);
        assert_eq!(stats.created, 0);
        assert_eq!(stats.errored, 2);
        assert_eq!(stats.incomplete, 0);
    }

    #[test]
    fn test_failed_attachments_leave_created_notes_incomplete() {
        let mut dest = MemoryDestination {
            fail_attachments: true,
            ..MemoryDestination::default()
        };
        let mut stats = ImportStats::default();
        {
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings(10)).unwrap();
            writer.stage(note("a", &["a.png", "b.png"]), &mut stats).unwrap();
            writer.stage(note("plain", &[]), &mut stats).unwrap();
            assert!(writer.flush(&mut stats).is_err());
        }
        assert_eq!(dest.note_rows.len(), 2);
        assert!(dest.attachment_rows.is_empty());
        assert_eq!(stats.created, 2);
        assert_eq!(stats.incomplete, 1);
        assert_eq!(stats.errored, 0);
        assert_eq!(stats.batches, 0);
    }

    #[test]
    fn test_failed_attachments_keep_existing_note_incomplete() {
        let existing = note("a", &["a.png"]);
        let mut dest = MemoryDestination {
            fail_attachments: true,
            ..MemoryDestination::default()
        };
        dest.existing.record_note(&existing.id);

        let mut stats = ImportStats::default();
        {
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings(10)).unwrap();
            writer.stage(existing, &mut stats).unwrap();
            assert!(writer.flush(&mut stats).is_err());
        }
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.incomplete, 1);
        assert_eq!(stats.errored, 0);
    }

    #[test]
    fn test_repeat_flush_failure_counts_incoming_note() {
        let mut dest = MemoryDestination {
            fail_notes: true,
            ..MemoryDestination::default()
        };
        let mut stats = ImportStats::default();
        {
            let mut writer = BatchWriter::begin(&mut dest, &AllFiles, settings(10)).unwrap();
            writer.stage(note("a", &[]), &mut stats).unwrap();
            assert!(writer.stage(note("a", &[]), &mut stats).is_err());
            assert_eq!(writer.pending_len(), 0);
        }
        assert_eq!(stats.errored, 2);
        assert_eq!(stats.created, 0);
    }

    #[test]
    fn test_describe_notes_dedupes() {
        let a = note("a", &[]);
        let described = describe_notes([&a, &a].into_iter());
        assert_eq!(described, format!("notes {} (a.json)", a.id));
    }
}
