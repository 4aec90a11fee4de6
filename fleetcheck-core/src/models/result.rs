//! Check, host and fleet result models
//!
//! All types are serializable; the JSON report is a direct projection of
//! these structures.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of a single check outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// Within thresholds
    Ok,
    /// Above the warning threshold
    Warn,
    /// Above the critical threshold
    Critical,
    /// Command or parse failure, no classification possible
    Unknown,
}

impl Verdict {
    /// Rank used to pick the worst verdict of a host.
    ///
    /// UNKNOWN ranks above OK but below any threshold breach.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Unknown => 1,
            Self::Warn => 2,
            Self::Critical => 3,
        }
    }

    /// Upper-case label used in reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// CSS class used by the HTML projection
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed value produced by a check parser
///
/// Variants never coerce into each other; a verdict rule that expects a
/// number treats any other variant as UNKNOWN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricValue {
    /// Number with a unit (`%`, `load`, ...)
    Numeric {
        /// Measured value
        value: f64,
        /// Unit label
        unit: String,
    },
    /// Elapsed time, whole seconds
    Duration {
        /// Seconds
        seconds: u64,
    },
    /// Yes/no outcome
    Boolean {
        /// Outcome
        value: bool,
    },
    /// Free text
    Text {
        /// Text
        value: String,
    },
}

impl MetricValue {
    /// Numeric value with unit
    #[must_use]
    pub fn numeric(value: f64, unit: impl Into<String>) -> Self {
        Self::Numeric {
            value,
            unit: unit.into(),
        }
    }

    /// Percentage
    #[must_use]
    pub fn percent(value: f64) -> Self {
        Self::numeric(value, "%")
    }

    /// Returns the number for `Numeric`, `None` otherwise
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Returns the flag for `Boolean`, `None` otherwise
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean { value } => Some(*value),
            _ => None,
        }
    }

    /// Returns the seconds for `Duration`, `None` otherwise
    #[must_use]
    pub const fn as_seconds(&self) -> Option<u64> {
        match self {
            Self::Duration { seconds } => Some(*seconds),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric { value, unit } if unit == "%" => write!(f, "{value:.1}%"),
            Self::Numeric { value, unit } => write!(f, "{value:.2} {unit}"),
            Self::Duration { seconds } => {
                let days = seconds / 86_400;
                let hours = (seconds % 86_400) / 3600;
                let minutes = (seconds % 3600) / 60;
                if days > 0 {
                    write!(f, "{days}d {hours}h {minutes}m")
                } else if hours > 0 {
                    write!(f, "{hours}h {minutes}m")
                } else {
                    write!(f, "{minutes}m {}s", seconds % 60)
                }
            }
            Self::Boolean { value } => write!(f, "{value}"),
            Self::Text { value } => f.write_str(value),
        }
    }
}

/// Outcome of one check against one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check definition
    pub check: String,
    /// Classification
    pub verdict: Verdict,
    /// Parsed value; absent when the command or parser failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<MetricValue>,
    /// Raw command output, truncated for report inclusion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    /// Failure reason; present iff `value` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    /// A successfully parsed and classified check
    #[must_use]
    pub fn classified(
        check: impl Into<String>,
        value: MetricValue,
        verdict: Verdict,
        raw_output: Option<String>,
    ) -> Self {
        Self {
            check: check.into(),
            verdict,
            value: Some(value),
            raw_output,
            error: None,
        }
    }

    /// A check whose command or parser failed; always UNKNOWN
    #[must_use]
    pub fn failed(
        check: impl Into<String>,
        error: impl Into<String>,
        raw_output: Option<String>,
    ) -> Self {
        Self {
            check: check.into(),
            verdict: Verdict::Unknown,
            value: None,
            raw_output,
            error: Some(error.into()),
        }
    }
}

/// Category of a session or command failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Operation did not finish in time (including the run deadline)
    Timeout,
    /// Authentication was rejected
    Auth,
    /// Host could not be reached
    Unreachable,
    /// Transport-level protocol failure
    Protocol,
    /// Run was cancelled before the host finished
    Cancelled,
    /// Anything else, including non-zero exit status
    Other,
}

impl FailureKind {
    /// Short label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::Unreachable => "unreachable",
            Self::Protocol => "protocol",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a host could not be checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionError {
    /// Failure category
    pub kind: FailureKind,
    /// Human-readable detail
    pub message: String,
}

impl ConnectionError {
    /// Creates a connection error
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Overall state of one host after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostHealth {
    /// Every check OK
    Healthy,
    /// Worst verdict WARN
    Warning,
    /// Worst verdict CRITICAL
    Critical,
    /// Worst verdict UNKNOWN
    Unknown,
    /// Session could not be opened or the host timed out
    Unreachable,
}

impl HostHealth {
    /// Upper-case label used in reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Healthy => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
            Self::Unreachable => "UNREACHABLE",
        }
    }

    /// CSS class used by the HTML projection
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Healthy => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
            Self::Unreachable => "down",
        }
    }

    /// Hosts an operator should look at
    #[must_use]
    pub const fn needs_attention(self) -> bool {
        matches!(self, Self::Warning | Self::Critical | Self::Unreachable)
    }
}

/// Complete outcome of checking one target
///
/// `reachable == false` iff `checks` is empty and `connection_error` is set.
/// A reachable host carries exactly one [`CheckResult`] per check definition,
/// in definition order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostResult {
    /// Target identifier
    pub target_id: String,
    /// Whether a session was established and all checks ran
    pub reachable: bool,
    /// Per-check outcomes in definition order
    pub checks: Vec<CheckResult>,
    /// Present iff the host is unreachable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_error: Option<ConnectionError>,
    /// When the runner started
    pub started_at: DateTime<Utc>,
    /// When the runner finished
    pub finished_at: DateTime<Utc>,
}

impl HostResult {
    /// A host whose checks all ran
    #[must_use]
    pub fn reachable(
        target_id: impl Into<String>,
        checks: Vec<CheckResult>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            reachable: true,
            checks,
            connection_error: None,
            started_at,
            finished_at,
        }
    }

    /// A host that could not be checked
    #[must_use]
    pub fn unreachable(
        target_id: impl Into<String>,
        error: ConnectionError,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            reachable: false,
            checks: Vec::new(),
            connection_error: Some(error),
            started_at,
            finished_at,
        }
    }

    /// Time spent on this host
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Health derived from reachability and the worst verdict
    #[must_use]
    pub fn health(&self) -> HostHealth {
        if !self.reachable {
            return HostHealth::Unreachable;
        }
        match self.worst_verdict() {
            None | Some(Verdict::Ok) => HostHealth::Healthy,
            Some(Verdict::Unknown) => HostHealth::Unknown,
            Some(Verdict::Warn) => HostHealth::Warning,
            Some(Verdict::Critical) => HostHealth::Critical,
        }
    }

    /// Worst verdict among the checks, `None` when there are none
    #[must_use]
    pub fn worst_verdict(&self) -> Option<Verdict> {
        self.checks
            .iter()
            .map(|c| c.verdict)
            .max_by_key(|v| v.severity())
    }

    /// Looks up a check by name
    #[must_use]
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.check == name)
    }
}

/// Check verdict totals across a fleet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictCounts {
    /// OK checks
    pub ok: usize,
    /// WARN checks
    pub warn: usize,
    /// CRITICAL checks
    pub critical: usize,
    /// UNKNOWN checks
    pub unknown: usize,
}

impl VerdictCounts {
    fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Ok => self.ok += 1,
            Verdict::Warn => self.warn += 1,
            Verdict::Critical => self.critical += 1,
            Verdict::Unknown => self.unknown += 1,
        }
    }
}

/// Host counts per [`HostHealth`] plus check verdict totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSummary {
    /// Number of hosts
    pub total: usize,
    /// Hosts with every check OK
    pub healthy: usize,
    /// Hosts whose worst verdict is WARN
    pub warning: usize,
    /// Hosts whose worst verdict is CRITICAL
    pub critical: usize,
    /// Hosts whose worst verdict is UNKNOWN
    pub unknown: usize,
    /// Hosts that could not be checked
    pub unreachable: usize,
    /// Verdict totals over all checks of reachable hosts
    pub checks: VerdictCounts,
}

impl FleetSummary {
    /// One-line summary, e.g. `2 healthy, 1 unreachable, 0 warnings, 0 criticals.`
    #[must_use]
    pub fn headline(&self) -> String {
        let mut line = format!(
            "{} healthy, {} unreachable, {} warnings, {} criticals",
            self.healthy, self.unreachable, self.warning, self.critical
        );
        if self.unknown > 0 {
            line.push_str(&format!(", {} unknown", self.unknown));
        }
        line.push('.');
        line
    }

    /// True when some host is unreachable or critical
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.unreachable > 0 || self.critical > 0
    }
}

/// Complete outcome of one monitoring run
///
/// `host_results` holds exactly one entry per target supplied to the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetResult {
    /// Run identifier
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// The run deadline elapsed before every target reported
    #[serde(default)]
    pub deadline_exceeded: bool,
    /// The run was cancelled before every target reported
    #[serde(default)]
    pub cancelled: bool,
    /// Per-target outcomes keyed by target id
    pub host_results: BTreeMap<String, HostResult>,
}

impl FleetResult {
    /// Aggregates host health and check verdicts
    #[must_use]
    pub fn summary(&self) -> FleetSummary {
        let mut summary = FleetSummary {
            total: self.host_results.len(),
            ..FleetSummary::default()
        };
        for host in self.host_results.values() {
            match host.health() {
                HostHealth::Healthy => summary.healthy += 1,
                HostHealth::Warning => summary.warning += 1,
                HostHealth::Critical => summary.critical += 1,
                HostHealth::Unknown => summary.unknown += 1,
                HostHealth::Unreachable => summary.unreachable += 1,
            }
            for check in &host.checks {
                summary.checks.add(check.verdict);
            }
        }
        summary
    }

    /// Hosts that could not be checked
    pub fn unreachable_hosts(&self) -> impl Iterator<Item = &HostResult> {
        self.host_results.values().filter(|h| !h.reachable)
    }

    /// Time spent on the whole run
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
