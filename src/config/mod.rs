//! Configuration management.
//!
//! A run is configured by a JSON file (`config.json`) plus command-line
//! overrides. The loaded [`ImportConfig`] is a plain value passed into the
//! pipeline; nothing reads configuration from global state.
//!
//! File resolution:
//! 1. `--config` flag
//! 2. `NTS_CONFIG` environment variable
//! 3. `~/.notes-to-sheets/config.json`
//!
//! A missing file means defaults.

pub mod processing;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::writer::WriterSettings;
use crate::validate::ValidationPolicy;
use processing::{ActionTable, LabelNames, ProcessingConfig};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "NTS_CONFIG";

/// Environment variable naming the destination directory.
pub const DEST_ENV: &str = "NTS_DEST";

/// Default number of notes per batch.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Everything a run needs besides the source and destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Action per attribute
    pub processing: ActionTable,

    /// Label display names
    pub labels: LabelNames,

    pub batch_size: usize,

    /// Stop after this many flushed batches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batches: Option<usize>,

    /// Stop after this many source records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_notes: Option<usize>,

    pub validation: ValidationPolicy,

    /// Upload image bytes; when off, only attachment rows are written
    pub import_images: bool,

    pub retry: RetryPolicy,

    /// Destination directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            processing: ActionTable::default(),
            labels: LabelNames::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_batches: None,
            max_notes: None,
            validation: ValidationPolicy::Strict,
            import_images: true,
            retry: RetryPolicy::default(),
            destination: None,
        }
    }
}

/// Command-line settings that take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOverrides {
    pub batch_size: Option<usize>,
    pub max_batches: Option<usize>,
    pub max_notes: Option<usize>,
    /// `--ignore-errors`: tolerant validation
    pub ignore_errors: bool,
    /// `--no-image-import`
    pub no_image_import: bool,
}

impl ImportConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be a positive integer".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::Config(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }
        if self.max_batches == Some(0) {
            return Err(Error::Config("max_batches must be positive when set".into()));
        }
        if self.max_notes == Some(0) {
            return Err(Error::Config("max_notes must be positive when set".into()));
        }
        Ok(())
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ImportOverrides) -> Self {
        if let Some(size) = overrides.batch_size {
            self.batch_size = size;
        }
        if overrides.max_batches.is_some() {
            self.max_batches = overrides.max_batches;
        }
        if overrides.max_notes.is_some() {
            self.max_notes = overrides.max_notes;
        }
        if overrides.ignore_errors {
            self.validation = ValidationPolicy::Tolerant;
        }
        if overrides.no_image_import {
            self.import_images = false;
        }
        self
    }

    /// The processor's view of this config.
    #[must_use]
    pub fn processing_config(&self) -> ProcessingConfig {
        ProcessingConfig {
            actions: self.processing.clone(),
            labels: self.labels.clone(),
        }
    }

    /// The batch writer's view of this config.
    #[must_use]
    pub fn writer_settings(&self) -> WriterSettings {
        WriterSettings {
            batch_size: self.batch_size,
            import_images: self.import_images,
            retry: self.retry,
        }
    }
}

/// Get the global importer directory (`~/.notes-to-sheets`).
#[must_use]
pub fn global_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".notes-to-sheets"))
}

/// Resolve the config file path.
///
/// Priority: explicit path, then `NTS_CONFIG`, then the global location.
#[must_use]
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    global_dir().map(|dir| dir.join("config.json"))
}

/// Resolve the destination directory.
///
/// Priority: explicit path, then `NTS_DEST`, then `destination` from the
/// config file, then `~/.notes-to-sheets/destination`.
///
/// # Errors
///
/// Returns `Error::Config` if no location can be determined.
pub fn resolve_destination(explicit_path: Option<&Path>, config: &ImportConfig) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(DEST_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    if let Some(path) = &config.destination {
        return Ok(path.clone());
    }

    global_dir()
        .map(|dir| dir.join("destination"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the config file at `path`; a missing file yields defaults.
///
/// # Errors
///
/// Returns `Error::Config` if the file cannot be read or parsed, or holds
/// invalid values.
pub fn load_config(path: &Path) -> Result<ImportConfig> {
    if !path.exists() {
        return Ok(ImportConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    let config: ImportConfig = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {e}", path.display()))
    })?;

    config.validate()?;
    Ok(config)
}

/// Write `config` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns `Error::Config` if the file cannot be written.
pub fn save_config(path: &Path, config: &ImportConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use processing::{Attribute, ProcessingAction};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("absent.json")).unwrap();
        assert_eq!(config, ImportConfig::default());
        assert_eq!(config.batch_size, 20);
        assert!(config.import_images);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"batch_size": 5, "processing": {"pinned": "skip"}}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.processing.get(Attribute::Pinned), ProcessingAction::Skip);
        assert_eq!(config.processing.get(Attribute::Trashed), ProcessingAction::Skip);
        assert_eq!(config.labels.pinned, "Pinned");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"batchsize": 5}"#).unwrap();
        assert!(matches!(load_config(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"batch_size": 0}"#).unwrap();
        assert!(matches!(load_config(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let mut config = ImportConfig::default();
        config.max_notes = Some(10);
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_overrides_win() {
        let config = ImportConfig::default().with_overrides(&ImportOverrides {
            batch_size: Some(3),
            max_batches: Some(2),
            max_notes: None,
            ignore_errors: true,
            no_image_import: true,
        });
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_batches, Some(2));
        assert_eq!(config.max_notes, None);
        assert_eq!(config.validation, ValidationPolicy::Tolerant);
        assert!(!config.import_images);
    }

    #[test]
    fn test_explicit_destination_wins() {
        let mut config = ImportConfig::default();
        config.destination = Some(PathBuf::from("/from/config"));
        let explicit = resolve_destination(Some(Path::new("/explicit")), &config).unwrap();
        assert_eq!(explicit, PathBuf::from("/explicit"));
    }
}
