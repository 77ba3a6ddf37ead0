//! Command implementations.

pub mod completions;
pub mod config;
pub mod import;
pub mod status;
pub mod version;
pub mod wipe;

use std::path::{Path, PathBuf};

use crate::config::{load_config, resolve_config_path, resolve_destination, ImportConfig};
use crate::error::Result;

/// Load the effective config file and resolve the destination directory.
///
/// # Errors
///
/// Returns an error if the config file is invalid or no destination can be
/// determined.
pub fn load_context(
    config_path: Option<&Path>,
    dest: Option<&Path>,
) -> Result<(ImportConfig, PathBuf)> {
    let config = match resolve_config_path(config_path) {
        Some(path) => load_config(&path)?,
        None => ImportConfig::default(),
    };
    let destination = resolve_destination(dest, &config)?;
    Ok((config, destination))
}
