//! Status command implementation.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::storage::{DestinationCounts, SqliteDestination};

#[derive(Serialize)]
struct StatusOutput {
    destination: String,
    exists: bool,
    #[serde(flatten)]
    counts: DestinationCounts,
}

/// Execute the status command.
///
/// A destination that was never written to reports zero rows and is not
/// created.
///
/// # Errors
///
/// Returns an error if the destination exists but cannot be read.
pub fn execute(config_path: Option<&Path>, dest: Option<&Path>, json: bool) -> Result<()> {
    let (_, destination_dir) = super::load_context(config_path, dest)?;

    let exists = destination_dir.join(crate::storage::sqlite::DB_FILE).exists();
    let counts = if exists {
        SqliteDestination::open(&destination_dir)?.counts()?
    } else {
        DestinationCounts::default()
    };

    if json {
        let output = StatusOutput {
            destination: destination_dir.display().to_string(),
            exists,
            counts,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Destination".cyan().bold());
    println!("  Path:        {}", destination_dir.display());
    if !exists {
        println!("  Nothing imported yet.");
        return Ok(());
    }
    println!("  Notes:       {}", counts.notes);
    println!("  Attachments: {}", counts.attachments);
    println!("  Files:       {}", counts.files);
    Ok(())
}
