//! The import run: source records in, destination rows out.
//!
//! For each record, in source order: validate, process, then stage the
//! processed note in the batch writer. A run stops early when a limit is
//! reached or a fatal error occurs; either way the notes already staged are
//! flushed and a report with the counters is returned.

use tracing::{debug, info, info_span, warn};

use crate::config::ImportConfig;
use crate::error::{Error, Result};
use crate::pipeline::processor::{process, ProcessOutcome};
use crate::pipeline::types::{ImportReport, ImportStats};
use crate::pipeline::writer::BatchWriter;
use crate::source::{NoteSource, SourceRecord};
use crate::storage::Destination;
use crate::validate::{parse_note, ValidationPolicy};

/// Runs one import from a source into a destination.
pub struct Importer<'a> {
    source: &'a dyn NoteSource,
    destination: &'a mut dyn Destination,
    config: &'a ImportConfig,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub fn new(
        source: &'a dyn NoteSource,
        destination: &'a mut dyn Destination,
        config: &'a ImportConfig,
    ) -> Self {
        Self {
            source,
            destination,
            config,
        }
    }

    /// Run the import.
    ///
    /// Never fails outright: a fatal error is carried in the report next to
    /// the counters gathered up to that point.
    #[must_use]
    pub fn run(self) -> ImportReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("import", run_id = %run_id);
        let _guard = span.enter();

        let mut report = ImportReport {
            run_id,
            ..ImportReport::default()
        };

        info!(
            batch_size = self.config.batch_size,
            validation = self.config.validation.as_str(),
            import_images = self.config.import_images,
            "starting import"
        );

        if let Err(err) = self.execute(&mut report) {
            warn!(error = %err, "import aborted");
            report.error = Some(err);
        }

        let stats = &report.stats;
        info!(
            processed = stats.processed,
            created = stats.created,
            completed = stats.completed,
            duplicates = stats.duplicates,
            skipped = stats.total_skipped(),
            invalid = stats.invalid,
            errored = stats.errored,
            incomplete = stats.incomplete,
            truncated = report.truncated,
            "import finished"
        );

        report
    }

    fn execute(self, report: &mut ImportReport) -> Result<()> {
        let Self {
            source,
            destination,
            config,
        } = self;
        config.validate()?;

        let processing = config.processing_config();
        let mut writer = BatchWriter::begin(destination, source, config.writer_settings())?;
        let mut records = source.records()?;
        let stats = &mut report.stats;

        loop {
            if limit_reached(config, stats) {
                report.truncated = records.next().is_some();
                break;
            }
            let Some(record) = records.next() else {
                break;
            };

            let staged = record.and_then(|record| {
                stats.processed += 1;
                stage_record(&record, config, &processing, &mut writer, stats)
            });

            if let Err(err) = staged {
                if !is_write_error(&err) {
                    stats.errored += 1;
                    // The failing record never reached the writer; flush what did.
                    if let Err(flush_err) = writer.flush(stats) {
                        warn!(error = %flush_err, "could not flush staged notes before aborting");
                    }
                }
                return Err(err);
            }
        }

        writer.flush(stats)
    }
}

/// Limits are checked between records, so a batch in flight always finishes.
fn limit_reached(config: &ImportConfig, stats: &ImportStats) -> bool {
    let notes_done = config.max_notes.is_some_and(|max| stats.processed >= max);
    let batches_done = config.max_batches.is_some_and(|max| stats.batches >= max);
    notes_done || batches_done
}

/// Validate, process and stage one record.
fn stage_record(
    record: &SourceRecord,
    config: &ImportConfig,
    processing: &crate::config::processing::ProcessingConfig,
    writer: &mut BatchWriter<'_>,
    stats: &mut ImportStats,
) -> Result<()> {
    let origin = record.origin.as_str();

    let raw = match parse_note(&record.bytes, origin) {
        Ok(raw) => raw,
        Err(err) if err.is_unsupported_content() => {
            return Err(Error::UnsupportedContent {
                origin: err.origin.clone(),
                detail: err.unsupported_detail(),
            });
        }
        Err(err) => match config.validation {
            ValidationPolicy::Strict => return Err(err.into()),
            ValidationPolicy::Tolerant => {
                warn!(error = %err, "excluding invalid record");
                stats.invalid += 1;
                return Ok(());
            }
        },
    };

    match process(&raw, processing, origin)? {
        ProcessOutcome::Imported { note, ignored } => {
            stats.count_ignored(&ignored);
            debug!(note = %note.id, origin, "staging note");
            writer.stage(note, stats)?;
        }
        ProcessOutcome::Skipped(signal) => {
            debug!(origin, title = %signal.title, reason = %signal.reason, "skipping note");
            stats.count_skip(signal.reason);
        }
    }

    Ok(())
}

fn is_write_error(err: &Error) -> bool {
    matches!(
        err,
        Error::TransientWrite { .. } | Error::PermanentWrite { .. }
    )
}
