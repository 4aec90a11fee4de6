//! Core data structures: targets and run results

mod result;
mod target;

pub use result::{
    CheckResult, ConnectionError, FailureKind, FleetResult, FleetSummary, HostHealth, HostResult,
    MetricValue, Verdict, VerdictCounts,
};
pub use target::{AuthMethod, AuthRef, DEFAULT_SSH_PORT, TargetDescriptor, filter_by_tag};
