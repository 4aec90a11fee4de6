//! Validate configuration command.

use std::fmt::Write as _;
use std::path::Path;

use fleetcheck_core::FleetConfig;

use super::Context;
use crate::error::CliError;
use crate::util::load_config;

/// Validate configuration command handler
pub fn cmd_validate(ctx: Context<'_>) -> Result<(), CliError> {
    let (path, config) = load_config(ctx.config_path)?;
    if !ctx.quiet {
        println!("{}", describe(&path, &config));
    }
    Ok(())
}

/// One-screen description of a loaded configuration
#[must_use]
pub fn describe(path: &Path, config: &FleetConfig) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Configuration OK: {}", path.display());
    let _ = writeln!(output, "  Hosts:       {}", config.targets.len());

    let names: Vec<&str> = config.checks.iter().map(|c| c.name()).collect();
    let _ = writeln!(
        output,
        "  Checks:      {} ({})",
        names.len(),
        names.join(", ")
    );
    let _ = writeln!(
        output,
        "  Concurrency: {}",
        config.run.effective_concurrency()
    );
    let _ = writeln!(
        output,
        "  Deadline:    {}s",
        config.run.run_deadline_secs
    );
    let _ = writeln!(
        output,
        "  Recipients:  {}",
        if config.notify.recipients.is_empty() {
            "(none)".to_string()
        } else {
            config.notify.recipients.join(", ")
        }
    );
    let _ = write!(
        output,
        "  SMTP:        {}",
        config.smtp.as_ref().map_or_else(
            || "not configured".to_string(),
            |smtp| format!("{}:{}", smtp.server, smtp.port)
        )
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcheck_core::config::{ConfigFormat, parse_fleet_config};

    #[test]
    fn test_describe_lists_checks_and_relay() {
        let content = r#"
[run]
concurrency = 3

[notify]
recipients = ["ops@example.com"]

[smtp]
server = "smtp.example.com"
from = "fleetcheck@example.com"

[[targets]]
id = "web-1"
host = "10.0.0.1"
"#;
        let config = parse_fleet_config(content, ConfigFormat::Toml, |_| None).unwrap();
        let text = describe(Path::new("fleet.toml"), &config);

        assert!(text.starts_with("Configuration OK: fleet.toml"));
        assert!(text.contains("Hosts:       1"));
        assert!(text.contains("cpu"));
        assert!(text.contains("Concurrency: 3"));
        assert!(text.contains("ops@example.com"));
        assert!(text.contains("smtp.example.com:587"));
    }
}
