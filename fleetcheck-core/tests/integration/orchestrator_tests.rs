//! End-to-end orchestrator runs over scripted sessions

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleetcheck_core::checks::CommandProbe;
use fleetcheck_core::testing::{ScriptedSessionProvider, TargetScript};
use fleetcheck_core::{
    CancellationToken, CheckDefinition, FailureKind, HostHealth, MetricValue, Orchestrator,
    RunLimits, SessionError, Verdict,
};
use regex::Regex;

use super::{fast_limits, service_checks, targets};

const NGINX: &str = "systemctl is-active nginx 2>/dev/null || true";

#[tokio::test]
async fn three_targets_with_one_open_timeout() {
    let provider = ScriptedSessionProvider::new()
        .with_default(TargetScript::new().fallback("active\n"))
        .with_target(
            "b",
            TargetScript::new()
                .open_delay(Duration::from_secs(5))
                .fallback("active\n"),
        );
    let stats = provider.stats();
    let orchestrator =
        Orchestrator::new(Arc::new(provider), service_checks(), fast_limits(3)).unwrap();

    let result = orchestrator.run(targets(&["a", "b", "c"])).await.unwrap();

    assert_eq!(result.host_results.len(), 3);

    let b = &result.host_results["b"];
    assert!(!b.reachable);
    assert!(b.checks.is_empty());
    assert_eq!(b.connection_error.as_ref().unwrap().kind, FailureKind::Timeout);

    for id in ["a", "c"] {
        let host = &result.host_results[id];
        assert!(host.reachable);
        assert!(host.connection_error.is_none());
        assert_eq!(host.checks.len(), 2);
        assert!(host.checks.iter().all(|c| c.verdict == Verdict::Ok));
        assert_eq!(host.checks[0].check, "nginx");
        assert_eq!(host.checks[1].check, "sshd");
    }

    assert_eq!(
        result.summary().headline(),
        "2 healthy, 1 unreachable, 0 warnings, 0 criticals."
    );
    assert!(!result.deadline_exceeded);
    assert_eq!(stats.closes(), 2);
}

#[tokio::test]
async fn unparsable_output_marks_only_that_check_unknown() {
    let provider = ScriptedSessionProvider::new().with_default(
        TargetScript::new()
            .respond(NGINX, "Segmentation fault\n")
            .fallback("active\n"),
    );
    let orchestrator =
        Orchestrator::new(Arc::new(provider), service_checks(), fast_limits(2)).unwrap();

    let result = orchestrator.run(targets(&["a"])).await.unwrap();
    let host = &result.host_results["a"];

    assert!(host.reachable);
    assert_eq!(host.checks.len(), 2);

    let nginx = &host.checks[0];
    assert_eq!(nginx.verdict, Verdict::Unknown);
    assert!(nginx.value.is_none());
    assert!(nginx.error.as_deref().unwrap().starts_with("Parse error:"));
    assert_eq!(nginx.raw_output.as_deref(), Some("Segmentation fault\n"));

    assert_eq!(host.checks[1].verdict, Verdict::Ok);
    assert_eq!(host.health(), HostHealth::Unknown);
    assert_eq!(
        result.summary().headline(),
        "0 healthy, 0 unreachable, 0 warnings, 0 criticals, 1 unknown."
    );
}

#[tokio::test]
async fn command_failure_continues_with_next_check() {
    let provider = ScriptedSessionProvider::new().with_default(
        TargetScript::new()
            .fail(NGINX, SessionError::other("Command failed (exit 127)"))
            .fallback("inactive\n"),
    );
    let stats = provider.stats();
    let orchestrator =
        Orchestrator::new(Arc::new(provider), service_checks(), fast_limits(1)).unwrap();

    let result = orchestrator.run(targets(&["a"])).await.unwrap();
    let host = &result.host_results["a"];

    assert!(host.reachable);
    assert_eq!(host.checks[0].verdict, Verdict::Unknown);
    assert!(host.checks[0].error.as_deref().unwrap().contains("exit 127"));
    assert_eq!(host.checks[1].verdict, Verdict::Critical);
    assert_eq!(host.health(), HostHealth::Critical);
    assert_eq!(stats.commands_for("a").len(), 2);
    assert_eq!(stats.closes(), 1);
}

#[tokio::test]
async fn auth_failure_is_recorded_not_raised() {
    let provider = ScriptedSessionProvider::new()
        .with_default(TargetScript::new().fallback("active\n"))
        .with_target(
            "locked",
            TargetScript::new().open_fails(SessionError::new(
                FailureKind::Auth,
                "Permission denied (publickey)",
            )),
        );
    let orchestrator =
        Orchestrator::new(Arc::new(provider), service_checks(), fast_limits(2)).unwrap();

    let result = orchestrator
        .run(targets(&["ok", "locked"]))
        .await
        .unwrap();

    let locked = &result.host_results["locked"];
    assert!(!locked.reachable);
    let error = locked.connection_error.as_ref().unwrap();
    assert_eq!(error.kind, FailureKind::Auth);
    assert_eq!(error.message, "Permission denied (publickey)");
    assert!(result.host_results["ok"].reachable);
}

#[tokio::test]
async fn run_deadline_degrades_unfinished_targets() {
    let provider = ScriptedSessionProvider::new()
        .with_default(
            TargetScript::new()
                .open_delay(Duration::from_secs(3))
                .fallback("active\n"),
        )
        .with_target("fast", TargetScript::new().fallback("active\n"));
    let limits = RunLimits {
        connect_timeout: Duration::from_secs(5),
        target_timeout: Duration::from_secs(5),
        run_deadline: Duration::from_millis(300),
        ..fast_limits(2)
    };
    let orchestrator = Orchestrator::new(Arc::new(provider), service_checks(), limits).unwrap();

    let started = Instant::now();
    let result = orchestrator
        .run(targets(&["fast", "slow-1", "slow-2", "queued"]))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(result.deadline_exceeded);
    assert!(!result.cancelled);

    let keys: BTreeSet<_> = result.host_results.keys().map(String::as_str).collect();
    assert_eq!(keys, BTreeSet::from(["fast", "queued", "slow-1", "slow-2"]));

    assert!(result.host_results["fast"].reachable);
    assert_eq!(result.host_results["fast"].checks.len(), 2);

    for id in ["slow-1", "slow-2", "queued"] {
        let host = &result.host_results[id];
        assert!(!host.reachable, "{id} should be unreachable");
        assert_eq!(
            host.connection_error.as_ref().unwrap().kind,
            FailureKind::Timeout
        );
    }
}

#[tokio::test]
async fn per_target_timeout_only_affects_that_target() {
    let provider = ScriptedSessionProvider::new()
        .with_default(TargetScript::new().fallback("active\n"))
        .with_target(
            "stuck",
            TargetScript::new().respond_after(NGINX, "active\n", Duration::from_secs(2)),
        );
    let stats = provider.stats();
    let limits = RunLimits {
        command_timeout: Duration::from_secs(5),
        target_timeout: Duration::from_millis(200),
        ..fast_limits(2)
    };
    let orchestrator = Orchestrator::new(Arc::new(provider), service_checks(), limits).unwrap();

    let result = orchestrator
        .run(targets(&["stuck", "fine"]))
        .await
        .unwrap();

    let stuck = &result.host_results["stuck"];
    assert!(!stuck.reachable);
    assert!(stuck.checks.is_empty());
    let error = stuck.connection_error.as_ref().unwrap();
    assert_eq!(error.kind, FailureKind::Timeout);
    assert!(error.message.contains("did not finish"));

    assert!(result.host_results["fine"].reachable);
    assert!(!result.deadline_exceeded);
    assert_eq!(stats.closes(), stats.opens());
}

#[tokio::test]
async fn cancellation_returns_collected_results() {
    let provider = ScriptedSessionProvider::new()
        .with_default(TargetScript::new().respond_after(
            NGINX,
            "active\n",
            Duration::from_secs(5),
        ))
        .with_target("quick", TargetScript::new().fallback("active\n"));
    let stats = provider.stats();
    let limits = RunLimits {
        command_timeout: Duration::from_secs(10),
        target_timeout: Duration::from_secs(10),
        ..fast_limits(2)
    };
    let orchestrator = Orchestrator::new(Arc::new(provider), service_checks(), limits).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = orchestrator
        .run_with_cancel(targets(&["quick", "slow-1", "slow-2", "never"]), &cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(result.cancelled);
    assert!(!result.deadline_exceeded);
    assert_eq!(result.host_results.len(), 4);
    assert!(result.host_results["quick"].reachable);

    for id in ["slow-1", "slow-2", "never"] {
        let host = &result.host_results[id];
        assert_eq!(
            host.connection_error.as_ref().unwrap().kind,
            FailureKind::Cancelled
        );
    }
    assert_eq!(stats.closes(), stats.opens());
}

#[tokio::test]
async fn command_templates_are_rendered_per_target() {
    let echo = CheckDefinition::new(
        "whoami",
        "echo {target_id}@{host}:{port}",
        Arc::new(CommandProbe::new(
            Regex::new("@").unwrap(),
            Verdict::Critical,
        )),
    );
    let provider = ScriptedSessionProvider::new()
        .with_default(TargetScript::new().fallback("web@10.0.0.1:22\n"));
    let stats = provider.stats();
    let orchestrator = Orchestrator::new(Arc::new(provider), vec![echo], fast_limits(1)).unwrap();

    let result = orchestrator.run(targets(&["web"])).await.unwrap();

    assert_eq!(stats.commands_for("web"), vec!["echo web@10.0.0.1:22"]);
    let check = &result.host_results["web"].checks[0];
    assert_eq!(check.value, Some(MetricValue::Boolean { value: true }));
    assert_eq!(check.verdict, Verdict::Ok);
}

#[tokio::test]
async fn duplicate_ids_fail_before_any_session() {
    let provider = ScriptedSessionProvider::new();
    let stats = provider.stats();
    let orchestrator =
        Orchestrator::new(Arc::new(provider), service_checks(), fast_limits(2)).unwrap();

    let mut list = targets(&["a", "b"]);
    list.push(list[0].clone());

    assert!(orchestrator.run(list).await.is_err());
    assert!(orchestrator.run(Vec::new()).await.is_err());
    assert_eq!(stats.opens(), 0);
}
