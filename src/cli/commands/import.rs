//! Import command implementation.

use std::path::Path;

use colored::Colorize;

use crate::cli::ImportArgs;
use crate::config::ImportOverrides;
use crate::error::Result;
use crate::pipeline::{ImportReport, Importer};
use crate::source::LocalSource;
use crate::storage::SqliteDestination;

/// Execute the import command.
///
/// The summary is printed whether or not the run succeeded.
///
/// # Errors
///
/// Returns the error that aborted the run, or a setup error if the source,
/// destination or config cannot be opened.
pub fn execute(
    args: &ImportArgs,
    config_path: Option<&Path>,
    dest: Option<&Path>,
    json: bool,
) -> Result<()> {
    let (config, destination_dir) = super::load_context(config_path, dest)?;
    let config = config.with_overrides(&ImportOverrides {
        batch_size: args.batch_size,
        max_batches: args.max_batches,
        max_notes: args.max_notes,
        ignore_errors: args.ignore_errors,
        no_image_import: args.no_image_import,
    });
    config.validate()?;

    let source = LocalSource::open(&args.source)?;
    let mut destination = SqliteDestination::open(&destination_dir)?;

    let report = Importer::new(&source, &mut destination, &config).run();

    if json {
        println!("{}", serde_json::to_string(&report.to_json())?);
    } else {
        print_summary(&report, &destination_dir);
    }

    report.into_result().map(|_| ())
}

fn print_summary(report: &ImportReport, destination: &Path) {
    let stats = &report.stats;

    let header = if report.is_success() {
        "Import complete".green().bold()
    } else {
        "Import aborted".red().bold()
    };
    println!("{header}");
    println!("  Destination: {}", destination.display());
    println!("  Run:         {}", report.run_id.dimmed());
    println!();

    println!("{}", "Notes".cyan().bold());
    println!("  Processed:   {}", stats.processed);
    println!("  Created:     {}", stats.created);
    println!("  Completed:   {}", stats.completed);
    println!("  Duplicates:  {}", stats.duplicates);
    if stats.invalid > 0 {
        println!("  Invalid:     {}", stats.invalid.to_string().yellow());
    }
    if stats.errored > 0 {
        println!("  Errored:     {}", stats.errored.to_string().red());
    }
    if stats.incomplete > 0 {
        println!("  Incomplete:  {}", stats.incomplete.to_string().yellow());
    }

    if !stats.skipped.is_empty() {
        println!("  Skipped:     {}", stats.total_skipped());
        for (attribute, count) in &stats.skipped {
            println!("    {attribute}: {count}");
        }
    }
    if !stats.ignored.is_empty() {
        let ignored: Vec<String> = stats
            .ignored
            .iter()
            .map(|(attribute, count)| format!("{attribute}={count}"))
            .collect();
        println!("  Ignored:     {}", ignored.join(", "));
    }
    println!();

    println!("{}", "Attachments".cyan().bold());
    println!("  Rows:        {}", stats.attachments_written);
    println!("  Uploaded:    {}", stats.files_uploaded);
    if stats.files_missing > 0 {
        println!("  Missing:     {}", stats.files_missing.to_string().yellow());
    }
    println!("  Batches:     {}", stats.batches);

    if report.truncated {
        println!();
        println!(
            "{} limit reached; re-run to continue where this run stopped.",
            "!".yellow()
        );
    }
}
