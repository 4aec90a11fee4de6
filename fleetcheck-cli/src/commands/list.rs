//! List hosts command.

use std::fmt::Write as _;

use fleetcheck_core::TargetDescriptor;

use super::Context;
use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::util::{load_config, select_targets};

/// List hosts command handler
pub fn cmd_list(ctx: Context<'_>, format: OutputFormat, tag: Option<&str>) -> Result<(), CliError> {
    let (_, config) = load_config(ctx.config_path)?;
    let targets = select_targets(&config.targets, tag)?;

    match format {
        OutputFormat::Table => println!("{}", format_table(&targets)),
        OutputFormat::Json => println!("{}", format_json(&targets)?),
    }

    Ok(())
}

/// Format hosts as a table string
#[must_use]
pub fn format_table(targets: &[TargetDescriptor]) -> String {
    if targets.is_empty() {
        return "No hosts found.".to_string();
    }

    let mut output = String::new();

    let id_width = targets.iter().map(|t| t.id.len()).max().unwrap_or(2).max(2);
    let address_width = targets
        .iter()
        .map(|t| t.address().len())
        .max()
        .unwrap_or(7)
        .max(7);
    let auth_width = 12;

    let _ = writeln!(
        output,
        "{:<id_width$}  {:<address_width$}  {:<auth_width$}  TAGS",
        "ID", "ADDRESS", "AUTH"
    );
    let _ = writeln!(
        output,
        "{:-<id_width$}  {:-<address_width$}  {:-<auth_width$}  ----",
        "", "", ""
    );

    for target in targets {
        let tags: Vec<&str> = target.tags.iter().map(String::as_str).collect();
        let _ = writeln!(
            output,
            "{:<id_width$}  {:<address_width$}  {:<auth_width$}  {}",
            target.id,
            target.address(),
            target.auth.method.name(),
            tags.join(",")
        );
    }

    output.trim_end().to_string()
}

/// Format hosts as a JSON array
///
/// # Errors
///
/// Returns `CliError::Config` if JSON serialization fails.
pub fn format_json(targets: &[TargetDescriptor]) -> Result<String, CliError> {
    let output: Vec<TargetOutput<'_>> = targets.iter().map(TargetOutput::from).collect();
    serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::Config(format!("Failed to serialize to JSON: {e}")))
}

/// Host as shown by `list --format json`; credentials reduced to the method
#[derive(Debug, serde::Serialize)]
struct TargetOutput<'a> {
    #[serde(flatten)]
    target: &'a TargetDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
    auth_method: &'static str,
}

impl<'a> From<&'a TargetDescriptor> for TargetOutput<'a> {
    fn from(target: &'a TargetDescriptor) -> Self {
        Self {
            target,
            user: target.auth.user.as_deref(),
            auth_method: target.auth.method.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcheck_core::models::AuthRef;

    fn sample() -> Vec<TargetDescriptor> {
        vec![
            TargetDescriptor::new("web-1", "10.0.0.1")
                .with_auth(AuthRef::agent("deploy"))
                .with_tag("web")
                .with_tag("prod"),
            TargetDescriptor::new("db-1", "db.internal").with_port(2222),
        ]
    }

    #[test]
    fn test_format_table() {
        let table = format_table(&sample());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("10.0.0.1:22"));
        assert!(lines[2].contains("agent"));
        assert!(lines[2].ends_with("prod,web"));
        assert!(lines[3].contains("db.internal:2222"));
    }

    #[test]
    fn test_format_table_empty() {
        assert_eq!(format_table(&[]), "No hosts found.");
    }

    #[test]
    fn test_format_json() {
        let json = format_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["id"], "web-1");
        assert_eq!(value[0]["user"], "deploy");
        assert_eq!(value[0]["auth_method"], "agent");
        assert_eq!(value[1]["port"], 2222);
        assert!(value[1].get("user").is_none());
    }
}
