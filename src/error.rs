//! Error types for the notes importer.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 4=validation, 6=write, 7=config, 8=io)
//! - Retryability flags (a re-run resumes where a failed run stopped)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use crate::validate::SchemaError;
use thiserror::Error;

/// Result type alias for importer operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,

    // Validation (exit 4)
    SchemaInvalid,
    ConfiguredAbort,
    UnsupportedContent,
    InvalidArgument,

    // Write (exit 6)
    TransientWrite,
    PermanentWrite,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    Cancelled,
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::SchemaInvalid => "SCHEMA_INVALID",
            Self::ConfiguredAbort => "CONFIGURED_ABORT",
            Self::UnsupportedContent => "UNSUPPORTED_CONTENT",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::TransientWrite => "TRANSIENT_WRITE",
            Self::PermanentWrite => "PERMANENT_WRITE",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError | Self::Cancelled => 1,
            Self::DatabaseError => 2,
            Self::SchemaInvalid
            | Self::ConfiguredAbort
            | Self::UnsupportedContent
            | Self::InvalidArgument => 4,
            Self::TransientWrite | Self::PermanentWrite => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether re-running the same import may succeed without changes.
    ///
    /// True for write failures: reconciliation makes the re-run skip
    /// everything that already landed. False for data and config problems,
    /// which fail the same way every time.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientWrite | Self::PermanentWrite | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur while importing notes.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema validation failed: {0}")]
    Schema(#[from] SchemaError),

    #[error("{origin}: note '{title}' has {attribute} set and processing.{attribute} is 'error'")]
    ConfiguredAbort {
        attribute: String,
        title: String,
        origin: String,
    },

    #[error("Unsupported content in {origin}: {detail}")]
    UnsupportedContent { origin: String, detail: String },

    #[error("{operation} failed after {attempts} attempts ({context}): {message}")]
    TransientWrite {
        operation: String,
        context: String,
        message: String,
        attempts: u32,
    },

    #[error("{operation} failed ({context}): {message}")]
    PermanentWrite {
        operation: String,
        context: String,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Schema(_) => ErrorCode::SchemaInvalid,
            Self::ConfiguredAbort { .. } => ErrorCode::ConfiguredAbort,
            Self::UnsupportedContent { .. } => ErrorCode::UnsupportedContent,
            Self::TransientWrite { .. } => ErrorCode::TransientWrite,
            Self::PermanentWrite { .. } => ErrorCode::PermanentWrite,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Cancelled(_) => ErrorCode::Cancelled,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Schema(err) => {
                let mut hint = String::new();
                if let Some(suggestion) = err.violations.iter().find_map(|v| v.suggestion.as_ref()) {
                    hint.push_str(&format!("Did you mean '{suggestion}'?\n  "));
                }
                hint.push_str("Re-run with --ignore-errors to exclude invalid records and continue.");
                Some(hint)
            }

            Self::ConfiguredAbort { attribute, .. } => Some(format!(
                "Set processing.{attribute} to label, skip or ignore in the config file \
                 (see `nts config show`)."
            )),

            Self::UnsupportedContent { .. } => Some(
                "Only image attachments and WEBLINK, SHEETS, DOCS, GMAIL annotations can be \
                 imported. Remove the offending record from the source to continue."
                    .to_string(),
            ),

            Self::TransientWrite { .. } | Self::PermanentWrite { .. } => Some(
                "Re-run the same import: notes already written are detected and skipped, \
                 missing attachments are backfilled."
                    .to_string(),
            ),

            Self::Config(_) => Some(
                "Check the config file with `nts config show`, or write a fresh one with \
                 `nts config init --force`."
                    .to_string(),
            ),

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Cancelled(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_errors_are_retryable() {
        let err = Error::PermanentWrite {
            operation: "append_note_rows".into(),
            context: "notes 1a2b".into(),
            message: "quota exceeded".into(),
        };
        assert_eq!(err.exit_code(), 6);
        assert!(err.error_code().is_retryable());
    }

    #[test]
    fn test_configured_abort_is_not_retryable() {
        let err = Error::ConfiguredAbort {
            attribute: "pinned".into(),
            title: "Groceries".into(),
            origin: "groceries.json".into(),
        };
        assert_eq!(err.exit_code(), 4);
        assert!(!err.error_code().is_retryable());
        assert!(err.hint().unwrap().contains("processing.pinned"));
    }

    #[test]
    fn test_structured_json_shape() {
        let err = Error::Config("batch_size must be positive".into());
        let json = err.to_structured_json();
        assert_eq!(json["error"]["code"], "CONFIG_ERROR");
        assert_eq!(json["error"]["exit_code"], 7);
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].is_string());
    }
}
