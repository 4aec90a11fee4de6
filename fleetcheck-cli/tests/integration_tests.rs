//! Integration tests for the fleetcheck CLI
//!
//! These tests run the binary end-to-end against temporary configuration
//! files: validation, listing, completions and a dry run against a host
//! that refuses connections.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run the CLI with given arguments
fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fleetcheck"))
        .env_remove("FLEETCHECK_CONFIG")
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

/// Helper to get stdout as string
fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Helper to get stderr as string
fn stderr_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Writes `content` as `name` inside `dir` and returns the path as a string
fn write_config(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write config");
    path.to_string_lossy().into_owned()
}

const FLEET: &str = r#"
[run]
concurrency = 2
connect_timeout_secs = 2
run_deadline_secs = 30

[notify]
recipients = ["ops@example.com"]

[[targets]]
id = "web-1"
host = "127.0.0.1"
port = 1
tags = ["web"]

[[targets]]
id = "db-1"
host = "127.0.0.1"
port = 1
tags = ["db"]
admin_contact = "dba@example.com"

[[checks]]
name = "nginx"
kind = "service"
unit = "nginx"
"#;

// ============================================================================
// Help and Completions
// ============================================================================

#[test]
fn test_help_command() {
    let output = run_cli(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = stdout_str(&output);
    assert!(stdout.contains("fleetcheck"), "Help should mention program name");
    assert!(stdout.contains("run"), "Help should mention run command");
    assert!(stdout.contains("validate"), "Help should mention validate command");
    assert!(stdout.contains("list"), "Help should mention list command");
}

#[test]
fn test_version_flag() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success());
    assert!(stdout_str(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_completions_bash() {
    let output = run_cli(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout_str(&output).contains("fleetcheck"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_accepts_good_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "fleet.toml", FLEET);

    let output = run_cli(&["--config", &config, "validate"]);

    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    let stdout = stdout_str(&output);
    assert!(stdout.contains("Configuration OK"));
    assert!(stdout.contains("Hosts:       2"));
    assert!(stdout.contains("nginx"));
}

#[test]
fn test_validate_rejects_duplicate_ids() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "fleet.toml",
        r#"
[[targets]]
id = "web-1"
host = "10.0.0.1"

[[targets]]
id = "web-1"
host = "10.0.0.2"
"#,
    );

    let output = run_cli(&["--config", &config, "validate"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("web-1"));
}

#[test]
fn test_validate_rejects_unknown_extension() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "fleet.ini", "[targets]");

    let output = run_cli(&["--config", &config, "validate"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("Unsupported configuration format"));
}

#[test]
fn test_missing_config_file() {
    let output = run_cli(&["--config", "/nonexistent/fleet.toml", "validate"]);
    assert_eq!(output.status.code(), Some(1));
}

// ============================================================================
// List
// ============================================================================

#[test]
fn test_list_table_filtered_by_tag() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "fleet.toml", FLEET);

    let output = run_cli(&["--config", &config, "list", "--tag", "db"]);

    assert!(output.status.success(), "stderr: {}", stderr_str(&output));
    let stdout = stdout_str(&output);
    assert!(stdout.contains("db-1"));
    assert!(!stdout.contains("web-1"));
}

#[test]
fn test_list_json() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "fleet.toml", FLEET);

    let output = run_cli(&["--config", &config, "list", "--format", "json"]);

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout_str(&output)).unwrap();
    let hosts = value.as_array().unwrap();
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0]["id"], "web-1");
    assert_eq!(hosts[1]["admin_contact"], "dba@example.com");
}

#[test]
fn test_list_unknown_tag_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "fleet.toml", FLEET);

    let output = run_cli(&["--config", &config, "list", "--tag", "cache"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_str(&output).contains("cache"));
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn test_dry_run_against_refused_hosts() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "fleet.toml", FLEET);
    let reports = dir.path().join("out");

    let output = run_cli(&[
        "--config",
        &config,
        "run",
        "--output-dir",
        &reports.to_string_lossy(),
        "--dry-run",
    ]);

    assert_eq!(
        output.status.code(),
        Some(2),
        "stderr: {}",
        stderr_str(&output)
    );

    let stdout = stdout_str(&output);
    assert!(stdout.contains("0 healthy, 2 unreachable"));
    assert!(stdout.contains("host_alert"));
    assert!(stdout.contains("dba@example.com"));

    for name in [
        "hosts/web-1_report.json",
        "hosts/db-1_report.html",
        "combined_report.json",
        "combined_report.html",
    ] {
        assert!(Path::new(&reports.join(name)).exists(), "{name} missing");
    }
}
