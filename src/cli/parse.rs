//! CLI parse: clap types for infogen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Infogen CLI - notebook-generated infographics from source URLs
#[derive(Parser)]
#[command(name = "infogen")]
#[command(about = "Generate infographics from source URLs through a notebook service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an infographic for one URL
    Generate {
        /// Source URL
        url: String,
        /// Display title (also names the notebook)
        #[arg(long)]
        title: Option<String>,
    },
    /// Edit, inspect and run the generation queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Show the focused (or given) unit and the lock state
    Status {
        /// Unit id or source URL (defaults to the focused unit)
        unit: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Forget a unit's state so it can start over
    Reset {
        /// Unit id or source URL
        unit: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// List completed infographics, newest first
    Gallery {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Write a stored infographic to a file
    Export {
        /// Unit id or source URL
        unit: String,
        /// Destination file
        path: PathBuf,
    },
    /// Print status notifications
    Events {
        /// Only events with a sequence number above this
        #[arg(long, default_value = "0")]
        after: u64,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Fail abandoned runs and purge expired results
    Sweep,
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Append a URL to the queue
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Remove the entry at a zero-based position
    Remove { index: usize },
    /// Remove every entry
    Clear,
    /// Show the queue with derived statuses
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Generate every queued entry in order
    Run,
}
