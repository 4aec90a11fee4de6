//! Configuration file to finished run

use std::sync::Arc;

use fleetcheck_core::config::load_fleet_config_with;
use fleetcheck_core::testing::{ScriptedSessionProvider, TargetScript};
use fleetcheck_core::{ConfigError, Orchestrator, RunLimits, Verdict, filter_by_tag};

const CONFIG: &str = r#"
[run]
concurrency = 2
connect_timeout_secs = 2
run_deadline_secs = 30

[notify]
recipients = ["ops@example.com"]

[[targets]]
id = "web-1"
host = "10.0.0.1"
tags = ["web"]

[[targets]]
id = "web-2"
host = "10.0.0.2"
tags = ["web"]

[[targets]]
id = "db-1"
host = "10.0.0.3"
tags = ["db"]

[[checks]]
kind = "load"

[[checks]]
kind = "uptime"
min_uptime_secs = 3600
"#;

fn write_config(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn loaded_config_drives_a_tagged_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "fleet.toml", CONFIG);
    let config = load_fleet_config_with(&path, |_| None).unwrap();

    let limits = RunLimits::from(&config.run);
    assert_eq!(limits.concurrency, 2);

    let web = filter_by_tag(&config.targets, "web");
    assert_eq!(web.len(), 2);

    let provider = ScriptedSessionProvider::new()
        .with_default(
            TargetScript::new()
                .respond("cat /proc/loadavg", "0.50 0.40 0.30 1/123 4567\n")
                .respond("cat /proc/uptime", "120.50 100.00\n"),
        )
        .with_target(
            "web-2",
            TargetScript::new()
                .respond("cat /proc/loadavg", "9.10 8.00 7.00 3/456 7890\n")
                .respond("cat /proc/uptime", "86400.00 1000.00\n"),
        );
    let orchestrator = Orchestrator::new(Arc::new(provider), config.checks, limits).unwrap();
    let result = orchestrator.run(web).await.unwrap();

    assert_eq!(result.host_results.len(), 2);

    let web1 = &result.host_results["web-1"];
    assert_eq!(web1.check("load").unwrap().verdict, Verdict::Ok);
    assert_eq!(web1.check("uptime").unwrap().verdict, Verdict::Warn);

    let web2 = &result.host_results["web-2"];
    assert_eq!(web2.check("load").unwrap().verdict, Verdict::Critical);
    assert_eq!(web2.check("uptime").unwrap().verdict, Verdict::Ok);

    assert_eq!(
        result.summary().headline(),
        "0 healthy, 0 unreachable, 1 warnings, 1 criticals."
    );
}

#[test]
fn malformed_checks_fail_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "fleet.yaml",
        "targets:\n  - id: a\n    host: h\nchecks:\n  - kind: command\n    name: broken\n    command: \"true\"\n    pattern: \"(\"\n",
    );
    let err = load_fleet_config_with(&path, |_| None).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidCheck { ref name, .. } if name == "broken"));
}
