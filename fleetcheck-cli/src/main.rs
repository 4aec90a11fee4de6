//! `fleetcheck` CLI - Command-line interface for the fleet health-check orchestrator
//!
//! Provides commands for running checks against every configured host,
//! validating configuration, listing hosts and generating shell completions.

mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use cli::Cli;
use fleetcheck_core::{TracingConfig, TracingLevel, TracingOutput, init_tracing};

use crate::commands::Context;
use crate::error::CliError;
use crate::util::Palette;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }

    let ctx = Context {
        config_path: cli.config.as_deref(),
        palette: Palette::new(!cli.no_color),
        quiet: cli.quiet,
    };

    if let Err(e) = commands::dispatch(ctx, cli.command) {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}

/// Maps `-v`/`-q`/`--log-file` onto the tracing subscriber
fn setup_logging(cli: &Cli) -> Result<(), CliError> {
    let level = if cli.quiet {
        TracingLevel::Error
    } else {
        TracingLevel::from_verbosity(cli.verbose)
    };
    let output = cli
        .log_file
        .clone()
        .map_or(TracingOutput::Stderr, |path| TracingOutput::File {
            path,
            mirror_stderr: !cli.quiet,
        });

    let config = TracingConfig::production()
        .with_level(level)
        .with_output(output)
        .with_ansi(!cli.no_color);
    init_tracing(&config)?;
    Ok(())
}
