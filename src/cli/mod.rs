//! CLI definitions using clap.

use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Migrate exported note archives into a tabular destination
#[derive(Parser, Debug)]
#[command(name = "nts", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.notes-to-sheets/config.json)
    #[arg(long, global = true, env = "NTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Destination directory (default: ~/.notes-to-sheets/destination)
    #[arg(long, global = true, env = "NTS_DEST")]
    pub dest: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import notes from an exported archive directory
    Import(ImportArgs),

    /// Show what the destination holds
    Status,

    /// Delete everything previously written to the destination
    Wipe {
        /// Skip the interactive prompts (requires --confirm)
        #[arg(long)]
        yes: bool,

        /// Destination directory name, repeated as confirmation
        #[arg(long, value_name = "DIR_NAME")]
        confirm: Option<String>,
    },

    /// Configuration file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print version information
    Version,
}

#[derive(Args, Debug, Default)]
pub struct ImportArgs {
    /// Directory holding the exported note files
    pub source: PathBuf,

    /// Notes per batch
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub batch_size: Option<usize>,

    /// Stop after this many batches
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_batches: Option<usize>,

    /// Stop after this many source notes
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_notes: Option<usize>,

    /// Exclude invalid notes instead of aborting
    #[arg(long)]
    pub ignore_errors: bool,

    /// Write attachment rows without uploading image files
    #[arg(long)]
    pub no_image_import: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
