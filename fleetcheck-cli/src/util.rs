//! Shared utility functions used across command modules.

use std::path::{Path, PathBuf};

use fleetcheck_core::{FleetConfig, TargetDescriptor, default_config_path, filter_by_tag};

use crate::error::CliError;

/// Resolves the configuration path from CLI args or the user config dir
pub fn config_file_path(config_path: Option<&Path>) -> Result<PathBuf, CliError> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path().ok_or_else(|| {
            CliError::Config("Cannot determine the user configuration directory".to_string())
        }),
    }
}

/// Loads and validates the fleet configuration
pub fn load_config(config_path: Option<&Path>) -> Result<(PathBuf, FleetConfig), CliError> {
    let path = config_file_path(config_path)?;
    let config = fleetcheck_core::load_fleet_config(&path)?;
    Ok((path, config))
}

/// Applies the optional `--tag` filter
pub fn select_targets(
    targets: &[TargetDescriptor],
    tag: Option<&str>,
) -> Result<Vec<TargetDescriptor>, CliError> {
    let Some(tag) = tag else {
        return Ok(targets.to_vec());
    };
    let selected = filter_by_tag(targets, tag);
    if selected.is_empty() {
        return Err(CliError::Config(format!("No hosts carry the tag '{tag}'")));
    }
    Ok(selected)
}

/// ANSI palette that collapses to empty strings when color is off
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub green: &'static str,
    pub yellow: &'static str,
    pub red: &'static str,
    pub bold: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub const fn new(color: bool) -> Self {
        if color {
            Self {
                green: "\x1b[32m",
                yellow: "\x1b[33m",
                red: "\x1b[31m",
                bold: "\x1b[1m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                green: "",
                yellow: "",
                red: "",
                bold: "",
                reset: "",
            }
        }
    }
}
