//! Config command implementation.

use std::path::Path;

use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::{resolve_config_path, save_config, ImportConfig};
use crate::error::{Error, Result};

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or written.
pub fn execute(
    command: &ConfigCommands,
    config_path: Option<&Path>,
    dest: Option<&Path>,
    json: bool,
) -> Result<()> {
    match command {
        ConfigCommands::Show => show(config_path, dest, json),
        ConfigCommands::Init { force } => init(config_path, *force, json),
    }
}

fn show(config_path: Option<&Path>, dest: Option<&Path>, json: bool) -> Result<()> {
    let (mut config, destination) = super::load_context(config_path, dest)?;
    config.destination = Some(destination);

    if json {
        println!("{}", serde_json::to_string(&config)?);
        return Ok(());
    }

    if let Some(path) = resolve_config_path(config_path) {
        let state = if path.exists() { "" } else { " (not found, using defaults)" };
        println!("{} {}{state}", "Config:".cyan().bold(), path.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init(config_path: Option<&Path>, force: bool, json: bool) -> Result<()> {
    let path = resolve_config_path(config_path)
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))?;

    if path.exists() && !force {
        return Err(Error::InvalidArgument(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }

    save_config(&path, &ImportConfig::default())?;

    if json {
        let output = serde_json::json!({ "path": path.display().to_string(), "written": true });
        println!("{output}");
    } else {
        println!("{} Wrote default config to {}", "✓".green(), path.display());
    }
    Ok(())
}
