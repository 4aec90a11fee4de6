//! Shared proptest strategies

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use fleetcheck_core::{
    CheckResult, ConnectionError, FailureKind, FleetResult, HostResult, MetricValue, Verdict,
};
use proptest::prelude::*;
use uuid::Uuid;

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap()
}

pub fn arb_verdict() -> impl Strategy<Value = Verdict> {
    prop_oneof![
        Just(Verdict::Ok),
        Just(Verdict::Warn),
        Just(Verdict::Critical),
    ]
}

pub fn arb_failure_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::Timeout),
        Just(FailureKind::Auth),
        Just(FailureKind::Unreachable),
        Just(FailureKind::Protocol),
        Just(FailureKind::Other),
    ]
}

pub fn arb_check_result() -> impl Strategy<Value = CheckResult> {
    (
        prop::sample::select(vec!["cpu", "memory", "swap", "disk", "nginx"]),
        arb_verdict(),
        0u32..=100,
        any::<bool>(),
        "[ -~]{0,40}",
    )
        .prop_map(|(name, verdict, percent, failed, raw)| {
            if failed {
                CheckResult::failed(name, "Parse error: unexpected output", Some(raw))
            } else {
                CheckResult::classified(name, MetricValue::percent(f64::from(percent)), verdict, None)
            }
        })
}

pub fn arb_host(id: String) -> impl Strategy<Value = HostResult> {
    (
        any::<bool>(),
        prop::collection::vec(arb_check_result(), 1..5),
        arb_failure_kind(),
        "[ -~]{0,30}",
    )
        .prop_map(move |(reachable, checks, kind, message)| {
            if reachable {
                HostResult::reachable(id.clone(), checks, fixed_time(), fixed_time())
            } else {
                HostResult::unreachable(
                    id.clone(),
                    ConnectionError::new(kind, message),
                    fixed_time(),
                    fixed_time(),
                )
            }
        })
}

pub fn arb_fleet() -> impl Strategy<Value = FleetResult> {
    prop::collection::btree_set("[a-z][a-z0-9-]{0,10}", 1..16)
        .prop_flat_map(|ids| {
            ids.into_iter()
                .map(arb_host)
                .collect::<Vec<_>>()
        })
        .prop_map(|hosts| FleetResult {
            run_id: Uuid::nil(),
            started_at: fixed_time(),
            finished_at: fixed_time(),
            deadline_exceeded: false,
            cancelled: false,
            host_results: hosts
                .into_iter()
                .map(|h| (h.target_id.clone(), h))
                .collect::<BTreeMap<_, _>>(),
        })
}
