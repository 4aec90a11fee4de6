//! Integration test modules and shared fixtures

mod config_tests;
mod notify_tests;
mod orchestrator_tests;

use std::time::Duration;

use fleetcheck_core::{CheckDefinition, RunLimits, TargetDescriptor};

/// Limits small enough to keep tests fast
pub fn fast_limits(concurrency: usize) -> RunLimits {
    RunLimits {
        concurrency,
        connect_timeout: Duration::from_millis(150),
        command_timeout: Duration::from_millis(500),
        target_timeout: Duration::from_secs(3),
        run_deadline: Duration::from_secs(10),
        close_timeout: Duration::from_millis(100),
        raw_output_limit: 1024,
    }
}

/// Two service checks, answered by a scripted `active`
pub fn service_checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::service("nginx", "nginx"),
        CheckDefinition::service("sshd", "sshd"),
    ]
}

/// Targets with ids `ids`, each on its own address
pub fn targets(ids: &[&str]) -> Vec<TargetDescriptor> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| TargetDescriptor::new(*id, format!("10.0.0.{}", i + 1)))
        .collect()
}
