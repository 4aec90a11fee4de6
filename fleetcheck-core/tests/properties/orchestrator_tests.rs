//! Property tests for orchestrator coverage

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use fleetcheck_core::testing::{ScriptedSessionProvider, TargetScript};
use fleetcheck_core::{
    CheckDefinition, FailureKind, Orchestrator, RunLimits, SessionError, TargetDescriptor,
};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Healthy,
    OpenFails,
    Garbage,
}

fn arb_behaviour() -> impl Strategy<Value = Behaviour> {
    prop_oneof![
        Just(Behaviour::Healthy),
        Just(Behaviour::OpenFails),
        Just(Behaviour::Garbage),
    ]
}

fn script(behaviour: Behaviour) -> TargetScript {
    match behaviour {
        Behaviour::Healthy => TargetScript::new().fallback("active\n"),
        Behaviour::OpenFails => TargetScript::new()
            .open_fails(SessionError::new(FailureKind::Unreachable, "No route to host")),
        Behaviour::Garbage => TargetScript::new().fallback("???\n"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: the result has exactly one entry per target for any
    /// concurrency bound, and every entry honors the reachability invariant
    #[test]
    fn every_target_reported_exactly_once(
        behaviours in prop::collection::vec(arb_behaviour(), 1..24),
        concurrency in 1usize..8,
    ) {
        let targets: Vec<TargetDescriptor> = (0..behaviours.len())
            .map(|i| TargetDescriptor::new(format!("t{i}"), format!("10.1.0.{i}")))
            .collect();

        let mut provider = ScriptedSessionProvider::new();
        for (target, behaviour) in targets.iter().zip(&behaviours) {
            provider = provider.with_target(target.id.clone(), script(*behaviour));
        }
        let stats = provider.stats();

        let checks = vec![
            CheckDefinition::service("nginx", "nginx"),
            CheckDefinition::service("sshd", "sshd"),
        ];
        let limits = RunLimits {
            concurrency,
            connect_timeout: Duration::from_millis(200),
            command_timeout: Duration::from_millis(200),
            target_timeout: Duration::from_secs(2),
            run_deadline: Duration::from_secs(10),
            close_timeout: Duration::from_millis(100),
            raw_output_limit: 256,
        };
        let orchestrator = Orchestrator::new(Arc::new(provider), checks, limits).unwrap();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(orchestrator.run(targets.clone())).unwrap();

        let expected: BTreeSet<String> = targets.iter().map(|t| t.id.clone()).collect();
        let actual: BTreeSet<String> = result.host_results.keys().cloned().collect();
        prop_assert_eq!(actual, expected);

        for host in result.host_results.values() {
            if host.reachable {
                prop_assert!(host.connection_error.is_none());
                prop_assert_eq!(host.checks.len(), 2);
            } else {
                prop_assert!(host.checks.is_empty());
                prop_assert!(host.connection_error.is_some());
            }
        }

        let opened = behaviours
            .iter()
            .filter(|b| !matches!(b, Behaviour::OpenFails))
            .count();
        prop_assert_eq!(stats.closes(), opened);
        prop_assert!(stats.max_active() <= concurrency);
    }
}
