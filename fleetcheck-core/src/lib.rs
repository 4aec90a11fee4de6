//! `fleetcheck` Core Library
//!
//! This crate checks the health of a fleet of remote hosts. It fans out
//! per-host checks with bounded parallelism, records per-host failures
//! without aborting the run, normalizes check output into a uniform result
//! model and aggregates everything into a fleet report that drives
//! notifications.
//!
//! # Crate Structure
//!
//! - [`models`] - Targets, check results, host and fleet results
//! - [`checks`] - Check definitions, built-in probes and output parsers
//! - [`session`] - Remote session traits and the OpenSSH provider
//! - [`runner`] - Runs every check against one target
//! - [`orchestrator`] - Runs every target with a bounded worker pool
//! - [`report`] - JSON, text and HTML projections
//! - [`notify`] - Notification policy and delivery
//! - [`config`] - Fleet configuration file and settings
//! - [`tracing`] - Structured logging setup
//! - [`testing`] - Scripted sessions and sinks for tests

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod checks;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod report;
pub mod runner;
pub mod session;
pub mod testing;
pub mod tracing;

pub use checks::{CheckDefinition, CheckProbe, Thresholds};
pub use config::{
    FleetConfig, NotifySettings, RunSettings, SmtpSettings, default_config_path,
    load_fleet_config,
};
pub use error::{
    ConfigError, ConfigResult, DeliveryError, FleetCheckError, FleetCheckResult, ParseError,
    SessionError, SessionResult,
};
pub use models::{
    AuthMethod, AuthRef, CheckResult, ConnectionError, FailureKind, FleetResult, FleetSummary,
    HostHealth, HostResult, MetricValue, TargetDescriptor, Verdict, filter_by_tag,
};
pub use notify::{
    IntentKind, NotificationIntent, NotificationPolicy, NotificationSink, deliver_all,
};
pub use orchestrator::{CancellationToken, Orchestrator, StopReason};
pub use report::{ReportError, ReportFormat, render_fleet, render_host};
pub use runner::{HostCheckRunner, RunLimits};
pub use session::{RemoteSession, SessionProvider, SshSessionProvider};
pub use tracing::{TracingConfig, TracingError, TracingLevel, TracingOutput, init_tracing};
