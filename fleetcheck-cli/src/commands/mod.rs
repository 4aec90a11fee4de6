//! Command handler modules for the CLI.

mod completions;
mod list;
mod run;
mod smtp;
mod validate;

use std::path::Path;

use crate::cli::Commands;
use crate::error::CliError;
use crate::util::Palette;

/// Global options every command may need
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub config_path: Option<&'a Path>,
    pub palette: Palette,
    pub quiet: bool,
}

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(ctx: Context<'_>, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run {
            tag,
            output_dir,
            dry_run,
        } => run::cmd_run(
            ctx,
            &run::RunParams {
                tag: tag.as_deref(),
                output_dir: &output_dir,
                dry_run,
            },
        ),
        Commands::Validate => validate::cmd_validate(ctx),
        Commands::List { format, tag } => list::cmd_list(ctx, format, tag.as_deref()),
        Commands::Completions { shell } => completions::cmd_completions(shell),
    }
}
