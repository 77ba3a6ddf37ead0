//! The import pipeline.
//!
//! # Submodules
//!
//! - [`hash`] - Deterministic note and attachment identifiers
//! - [`processor`] - Attribute processing (raw note to processed note)
//! - [`reconcile`] - Three-way classification against destination state
//! - [`retry`] - Exponential backoff for destination operations
//! - [`writer`] - Batching and write ordering
//! - [`import`] - The run loop tying source, pipeline and destination together
//! - [`types`] - Counters and the run report

pub mod hash;
pub mod import;
pub mod processor;
pub mod reconcile;
pub mod retry;
pub mod types;
pub mod writer;

pub use hash::{attachment_id, content_hash, note_id};
pub use import::Importer;
pub use processor::{process, ProcessOutcome, SkipSignal};
pub use reconcile::{classify, Completion, ExistingState, KnownAttachments, ReconcilePlan};
pub use retry::RetryPolicy;
pub use types::{ImportReport, ImportStats};
pub use writer::{BatchWriter, WriterSettings};
