//! Run results through reports and notification delivery

use std::sync::Arc;
use std::time::Duration;

use fleetcheck_core::notify::DeliveryOutcome;
use fleetcheck_core::report::{decode_fleet_json, render_fleet_html, render_fleet_json};
use fleetcheck_core::testing::{RecordingSink, ScriptedSessionProvider, TargetScript};
use fleetcheck_core::{
    FailureKind, IntentKind, NotificationPolicy, NotifySettings, Orchestrator, SessionError,
    deliver_all,
};

use super::{fast_limits, service_checks, targets};

async fn run_fleet() -> fleetcheck_core::FleetResult {
    let provider = ScriptedSessionProvider::new()
        .with_default(TargetScript::new().fallback("active\n"))
        .with_target(
            "db",
            TargetScript::new().open_fails(SessionError::new(
                FailureKind::Unreachable,
                "Connection refused",
            )),
        )
        .with_target(
            "cache",
            TargetScript::new()
                .open_delay(Duration::from_secs(5))
                .fallback("active\n"),
        );
    let orchestrator =
        Orchestrator::new(Arc::new(provider), service_checks(), fast_limits(4)).unwrap();
    orchestrator
        .run(targets(&["web", "db", "cache", "api"]))
        .await
        .unwrap()
}

#[tokio::test]
async fn unreachable_hosts_alert_their_admins() {
    let result = run_fleet().await;

    let mut fleet_targets = targets(&["web", "db", "cache", "api"]);
    fleet_targets[1].admin_contact = Some("dba@example.com".into());

    let settings = NotifySettings {
        recipients: vec!["ops@example.com".into()],
        admin_contact: Some("admin@example.com".into()),
        director_recipients: vec!["cto@example.com".into()],
        admin_digests: false,
    };
    let policy = NotificationPolicy::new(settings, &fleet_targets);
    let intents = policy.intents(&result);

    let alerts: Vec<_> = intents
        .iter()
        .filter(|i| matches!(i.kind, IntentKind::HostAlert { .. }))
        .collect();
    assert_eq!(alerts.len(), 2);
    assert_eq!(
        alerts[0].kind,
        IntentKind::HostAlert {
            target_id: "cache".into()
        }
    );
    assert_eq!(alerts[0].recipients, vec!["admin@example.com".to_string()]);
    assert_eq!(alerts[1].recipients, vec!["dba@example.com".to_string()]);

    let summaries: Vec<_> = intents
        .iter()
        .filter(|i| i.kind == IntentKind::FleetSummary)
        .collect();
    assert_eq!(summaries.len(), 1);
    assert!(
        summaries[0]
            .subject
            .ends_with("2 healthy, 2 unreachable, 0 warnings, 0 criticals.")
    );

    assert!(intents.iter().any(|i| i.kind == IntentKind::AttentionDigest));

    let sink = RecordingSink::failing_on("cache");
    let report = deliver_all(&sink, &intents, 2).await;

    assert_eq!(report.failed(), 1);
    assert_eq!(report.delivered(), intents.len() - 1);
    assert!(matches!(report.outcomes[0].1, DeliveryOutcome::Failed(_)));
    assert_eq!(sink.delivered().len(), intents.len() - 1);
}

#[tokio::test]
async fn fleet_reports_are_stable_and_lossless() {
    let result = run_fleet().await;

    let json = render_fleet_json(&result).unwrap();
    assert_eq!(json, render_fleet_json(&result).unwrap());
    assert_eq!(decode_fleet_json(&json).unwrap(), result);

    let html = render_fleet_html(&result);
    assert_eq!(html, render_fleet_html(&result));
    assert!(html.contains("Connection refused"));
}
