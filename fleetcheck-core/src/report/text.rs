//! Plain-text projection

use std::fmt::Write as _;

use super::{excerpt, format_duration};
use crate::models::{FleetResult, HostResult};

/// Renders one host as plain text
#[must_use]
pub fn render_host_text(result: &HostResult) -> String {
    let mut output = String::new();
    write_host(&mut output, result);
    output
}

fn write_host(output: &mut String, result: &HostResult) {
    let health = result.health();
    let _ = writeln!(output, "Host: {}", result.target_id);

    if let Some(error) = &result.connection_error {
        let _ = writeln!(output, "Status: {} ({error})", health.label());
    } else {
        let _ = writeln!(output, "Status: {}", health.label());
    }
    let _ = writeln!(
        output,
        "Checked: {} ({})",
        result.started_at.to_rfc3339(),
        format_duration(result.duration())
    );

    let width = result
        .checks
        .iter()
        .map(|c| c.check.len())
        .max()
        .unwrap_or(0);

    for check in &result.checks {
        let verdict = format!("[{}]", check.verdict.label());
        match (&check.value, &check.error) {
            (Some(value), _) => {
                let _ = writeln!(output, "  {verdict:<10} {:<width$}  {value}", check.check);
            }
            (None, error) => {
                let _ = writeln!(
                    output,
                    "  {verdict:<10} {:<width$}  error: {}",
                    check.check,
                    error.as_deref().unwrap_or("unknown")
                );
                if let Some(raw) = check.raw_output.as_deref().filter(|r| !r.trim().is_empty()) {
                    let (cut, truncated) = excerpt(raw);
                    for line in cut.lines() {
                        let _ = writeln!(output, "      > {line}");
                    }
                    if truncated {
                        output.push_str("      > ...\n");
                    }
                }
            }
        }
    }
}

/// Renders the fleet as plain text: headline, then one block per host
#[must_use]
pub fn render_fleet_text(result: &FleetResult) -> String {
    let summary = result.summary();
    let mut output = String::new();

    let _ = writeln!(output, "Fleet run {}", result.run_id);
    let _ = writeln!(
        output,
        "Started: {} ({})",
        result.started_at.to_rfc3339(),
        format_duration(result.duration())
    );
    let _ = writeln!(output, "{}", summary.headline());
    if result.deadline_exceeded {
        output.push_str("Run deadline exceeded; unfinished hosts are reported as timed out.\n");
    }
    if result.cancelled {
        output.push_str("Run cancelled; unfinished hosts are reported as cancelled.\n");
    }

    for host in result.host_results.values() {
        output.push('\n');
        write_host(&mut output, host);
    }
    output
}
