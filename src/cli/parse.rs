//! CLI parse: clap types for emote-sync. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// emote-sync CLI - reconcile declared emotes with a remote emoji registry
#[derive(Parser, Debug)]
#[command(name = "emote-sync")]
#[command(about = "Reconcile declared emotes against a content directory and an emoji registry")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile the registry with the manifest and persist the ledger
    Sync {
        /// Manifest path (overrides manifest.path)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Ledger path (overrides ledger.path)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Show what sync would change without touching the registry
    Plan {
        /// Manifest path (overrides manifest.path)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Ledger path (overrides ledger.path)
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the emotes recorded in the ledger
    Status {
        /// Ledger path (overrides ledger.path)
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

impl Commands {
    /// Short command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Sync { .. } => "sync",
            Commands::Plan { .. } => "plan",
            Commands::Status { .. } => "status",
        }
    }
}
