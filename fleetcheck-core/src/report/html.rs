//! HTML projection
//!
//! Self-contained documents with inline CSS so they render the same as a
//! file, in a browser, or as a mail body.

use std::fmt::Write as _;

use super::{excerpt, format_duration};
use crate::models::{FleetResult, HostResult};

const STYLE: &str = "<style>\
body { font-family: Arial, sans-serif; margin: 20px; color: #222; }\
h1 { color: #2E86C1; }\
h2 { color: #2874A6; border-bottom: 1px solid #ddd; }\
table { border-collapse: collapse; width: 100%; margin-bottom: 20px; }\
th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; vertical-align: top; }\
th { background-color: #f2f2f2; }\
.ok { color: #00b894; font-weight: bold; }\
.warning { color: #b8860b; font-weight: bold; }\
.critical { color: #d63031; font-weight: bold; }\
.unknown { color: #636e72; font-weight: bold; }\
.down { color: #d63031; font-weight: bold; }\
.summary { background: #f4f8fb; border-radius: 8px; padding: 12px 18px; margin-bottom: 18px; }\
.notice { background: #fffbe6; border-radius: 8px; padding: 10px 18px; margin-bottom: 18px; }\
pre { background: #f8f8f8; padding: 6px; margin: 4px 0 0 0; white-space: pre-wrap; }\
</style>";

/// Escapes text for HTML element and attribute content
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn open_document(output: &mut String, title: &str) {
    let _ = write!(
        output,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>{STYLE}</head><body>\n",
        escape_html(title)
    );
}

fn close_document(output: &mut String) {
    output.push_str("</body></html>\n");
}

/// Renders one host as an HTML document
#[must_use]
pub fn render_host_html(result: &HostResult) -> String {
    let mut output = String::new();
    open_document(&mut output, &format!("Health report: {}", result.target_id));
    let _ = writeln!(
        output,
        "<h1>Health report: {}</h1>",
        escape_html(&result.target_id)
    );
    write_host_section(&mut output, result);
    close_document(&mut output);
    output
}

fn write_host_section(output: &mut String, result: &HostResult) {
    let health = result.health();
    let _ = writeln!(
        output,
        "<p>Status: <span class=\"{}\">{}</span> &middot; checked {} in {}</p>",
        health.css_class(),
        health.label(),
        escape_html(&result.started_at.to_rfc3339()),
        format_duration(result.duration())
    );

    if let Some(error) = &result.connection_error {
        let _ = writeln!(
            output,
            "<p class=\"down\">Connection failed ({}): {}</p>",
            error.kind,
            escape_html(&error.message)
        );
        return;
    }

    output.push_str("<table><tr><th>Check</th><th>Value</th><th>Status</th></tr>\n");
    for check in &result.checks {
        let value = match (&check.value, &check.error) {
            (Some(value), _) => escape_html(&value.to_string()),
            (None, error) => {
                let mut cell = format!(
                    "error: {}",
                    escape_html(error.as_deref().unwrap_or("unknown"))
                );
                if let Some(raw) = check.raw_output.as_deref().filter(|r| !r.trim().is_empty()) {
                    let (cut, truncated) = excerpt(raw);
                    let _ = write!(
                        cell,
                        "<pre>{}{}</pre>",
                        escape_html(cut),
                        if truncated { "\n..." } else { "" }
                    );
                }
                cell
            }
        };
        let _ = writeln!(
            output,
            "<tr><td>{}</td><td>{value}</td><td class=\"{}\">{}</td></tr>",
            escape_html(&check.check),
            check.verdict.css_class(),
            check.verdict.label()
        );
    }
    output.push_str("</table>\n");
}

/// Renders the fleet as an HTML document: headline plus one table row per host
#[must_use]
pub fn render_fleet_html(result: &FleetResult) -> String {
    render_fleet_table(result, "Fleet health report", |_| true)
}

/// Renders only the hosts that are unreachable, warning or critical
#[must_use]
pub fn render_fleet_attention_html(result: &FleetResult) -> String {
    render_fleet_table(result, "Hosts needing attention", |host| {
        host.health().needs_attention()
    })
}

fn render_fleet_table<F>(result: &FleetResult, title: &str, include: F) -> String
where
    F: Fn(&HostResult) -> bool,
{
    let summary = result.summary();
    let mut output = String::new();
    open_document(&mut output, title);
    let _ = writeln!(output, "<h1>{}</h1>", escape_html(title));
    let _ = writeln!(
        output,
        "<div class=\"summary\"><strong>{}</strong><br>Run {} &middot; started {} &middot; {}</div>",
        escape_html(&summary.headline()),
        result.run_id,
        escape_html(&result.started_at.to_rfc3339()),
        format_duration(result.duration())
    );
    if result.deadline_exceeded {
        output.push_str(
            "<div class=\"notice\">Run deadline exceeded; unfinished hosts are reported as timed out.</div>\n",
        );
    }
    if result.cancelled {
        output.push_str(
            "<div class=\"notice\">Run cancelled; unfinished hosts are reported as cancelled.</div>\n",
        );
    }

    let hosts: Vec<&HostResult> = result.host_results.values().filter(|h| include(h)).collect();

    let mut columns: Vec<&str> = Vec::new();
    for host in &hosts {
        for check in &host.checks {
            if !columns.contains(&check.check.as_str()) {
                columns.push(&check.check);
            }
        }
    }

    if hosts.is_empty() {
        output.push_str("<p class=\"ok\">No hosts to show.</p>\n");
        close_document(&mut output);
        return output;
    }

    output.push_str("<table><tr><th>Host</th><th>Status</th>");
    for column in &columns {
        let _ = write!(output, "<th>{}</th>", escape_html(column));
    }
    output.push_str("</tr>\n");

    for host in hosts {
        let health = host.health();
        let _ = write!(
            output,
            "<tr><td>{}</td><td class=\"{}\">{}</td>",
            escape_html(&host.target_id),
            health.css_class(),
            health.label()
        );
        if let Some(error) = &host.connection_error {
            let _ = write!(
                output,
                "<td colspan=\"{}\" class=\"down\">{}: {}</td>",
                columns.len().max(1),
                error.kind,
                escape_html(&error.message)
            );
        } else {
            for column in &columns {
                match host.check(column) {
                    Some(check) => {
                        let shown = check
                            .value
                            .as_ref()
                            .map_or_else(|| check.verdict.label().to_string(), ToString::to_string);
                        let _ = write!(
                            output,
                            "<td class=\"{}\">{}</td>",
                            check.verdict.css_class(),
                            escape_html(&shown)
                        );
                    }
                    None => output.push_str("<td>-</td>"),
                }
            }
        }
        output.push_str("</tr>\n");
    }
    output.push_str("</table>\n");
    close_document(&mut output);
    output
}
