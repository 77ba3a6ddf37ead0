//! Run counters and the end-of-run report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::processing::Attribute;
use crate::error::Error;

/// Counters kept while a run progresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Source records consumed
    pub processed: usize,
    /// New note rows written
    pub created: usize,
    /// Existing notes that got missing attachments backfilled
    pub completed: usize,
    /// Notes already fully present
    pub duplicates: usize,
    /// Notes left out, per reason
    pub skipped: BTreeMap<Attribute, usize>,
    /// Attributes present but ignored, per attribute
    pub ignored: BTreeMap<Attribute, usize>,
    /// Records excluded by tolerant validation
    pub invalid: usize,
    /// Notes lost to a fatal error, with no row written
    pub errored: usize,
    /// Notes whose row exists but whose attachments a fatal error cut short;
    /// the next run completes them
    pub incomplete: usize,
    pub attachments_written: usize,
    pub files_uploaded: usize,
    /// Referenced images not found in the source
    pub files_missing: usize,
    /// Batches flushed
    pub batches: usize,
}

impl ImportStats {
    /// Total notes skipped, across reasons.
    #[must_use]
    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Notes that changed the destination.
    #[must_use]
    pub fn total_written(&self) -> usize {
        self.created + self.completed
    }

    pub(crate) fn count_skip(&mut self, reason: Attribute) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub(crate) fn count_ignored(&mut self, attributes: &[Attribute]) {
        for attribute in attributes {
            *self.ignored.entry(*attribute).or_default() += 1;
        }
    }
}

/// Outcome of a run: counters, whether a limit stopped it early, and the
/// fatal error if it aborted.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub run_id: String,
    pub stats: ImportStats,
    pub truncated: bool,
    pub error: Option<Error>,
}

impl ImportReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, keeping the stats on success.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the run.
    pub fn into_result(self) -> crate::error::Result<ImportStats> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.stats),
        }
    }

    /// JSON rendering, with the error in structured form.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "run_id": self.run_id,
            "stats": self.stats,
            "truncated": self.truncated,
            "success": self.is_success(),
        });
        if let Some(err) = &self.error {
            value["error"] = err.to_structured_json()["error"].clone();
        }
        value
    }
}
