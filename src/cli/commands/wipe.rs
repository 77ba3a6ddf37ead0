//! Wipe command implementation.
//!
//! Deletes every row and uploaded file at the destination. Because this is
//! irreversible, the caller must type `WIPE` and then the destination
//! directory name; scripts pass `--yes --confirm <dir-name>` instead.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::storage::{DestinationCounts, SqliteDestination};

const CONFIRM_WORD: &str = "WIPE";

#[derive(Serialize)]
struct WipeOutput {
    destination: String,
    removed: DestinationCounts,
}

/// Execute the wipe command.
///
/// # Errors
///
/// Returns `Error::Cancelled` if confirmation fails, or a storage error if
/// the destination cannot be cleared.
pub fn execute(
    yes: bool,
    confirm: Option<&str>,
    config_path: Option<&Path>,
    dest: Option<&Path>,
    json: bool,
) -> Result<()> {
    let (_, destination_dir) = super::load_context(config_path, dest)?;
    let dir_name = destination_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "Destination {} has no directory name",
                destination_dir.display()
            ))
        })?;

    if yes {
        check_confirmation(confirm, &dir_name)?;
    } else {
        if !io::stdin().is_terminal() {
            return Err(Error::InvalidArgument(
                "wipe needs a terminal; pass --yes --confirm <dir-name> to run unattended".into(),
            ));
        }
        let stdin = io::stdin();
        prompt_confirmation(&mut stdin.lock(), &dir_name, &destination_dir)?;
    }

    let mut destination = SqliteDestination::open(&destination_dir)?;
    let removed = destination.wipe()?;

    if json {
        let output = WipeOutput {
            destination: destination_dir.display().to_string(),
            removed,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} Wiped {} ({} notes, {} attachments, {} files)",
            "✓".green(),
            destination_dir.display(),
            removed.notes,
            removed.attachments,
            removed.files
        );
    }
    Ok(())
}

fn check_confirmation(confirm: Option<&str>, dir_name: &str) -> Result<()> {
    match confirm {
        Some(given) if given == dir_name => Ok(()),
        Some(given) => Err(Error::Cancelled(format!(
            "--confirm '{given}' does not match destination directory '{dir_name}'"
        ))),
        None => Err(Error::Cancelled(format!(
            "--yes requires --confirm {dir_name}"
        ))),
    }
}

/// Two-step interactive confirmation.
fn prompt_confirmation(input: &mut impl BufRead, dir_name: &str, dir: &Path) -> Result<()> {
    println!(
        "{} This deletes every note, attachment and file in {}",
        "!".red().bold(),
        dir.display()
    );

    let word = ask(input, &format!("Type {CONFIRM_WORD} to continue: "))?;
    if word != CONFIRM_WORD {
        return Err(Error::Cancelled("wipe not confirmed".into()));
    }

    let name = ask(input, &format!("Type the destination directory name ({dir_name}): "))?;
    if name != dir_name {
        return Err(Error::Cancelled(format!(
            "'{name}' does not match destination directory '{dir_name}'"
        )));
    }
    Ok(())
}

fn ask(input: &mut impl BufRead, prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_must_match_dir_name() {
        assert!(check_confirmation(Some("notes-dest"), "notes-dest").is_ok());
        assert!(matches!(
            check_confirmation(Some("other"), "notes-dest"),
            Err(Error::Cancelled(_))
        ));
        assert!(matches!(
            check_confirmation(None, "notes-dest"),
            Err(Error::Cancelled(_))
        ));
    }

    #[test]
    fn test_prompt_accepts_both_answers() {
        let mut input = io::Cursor::new("WIPE\nnotes-dest\n");
        assert!(prompt_confirmation(&mut input, "notes-dest", Path::new("/tmp/notes-dest")).is_ok());
    }

    #[test]
    fn test_prompt_rejects_wrong_word() {
        let mut input = io::Cursor::new("wipe\nnotes-dest\n");
        let result = prompt_confirmation(&mut input, "notes-dest", Path::new("/tmp/notes-dest"));
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }

    #[test]
    fn test_prompt_rejects_wrong_name() {
        let mut input = io::Cursor::new("WIPE\nelsewhere\n");
        let result = prompt_confirmation(&mut input, "notes-dest", Path::new("/tmp/notes-dest"));
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }
}
