//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// `fleetcheck` command-line interface for checking remote host health
#[derive(Parser)]
#[command(name = "fleetcheck")]
#[command(author, version, about = "Fleet health-check orchestrator")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the fleet configuration file
    #[arg(short, long, global = true, env = "FLEETCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Check every configured host
    #[command(about = "Run all checks against the fleet and send notifications")]
    Run {
        /// Only check hosts carrying this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Directory for per-host and combined reports
        #[arg(short, long, default_value = "reports", value_name = "DIR")]
        output_dir: PathBuf,

        /// Print notifications instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration file
    #[command(about = "Load and validate the configuration without connecting")]
    Validate,

    /// List configured hosts
    #[command(about = "List the hosts in the configuration")]
    List {
        /// Output format for the host list
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,

        /// Filter hosts by tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON array
    Json,
}
