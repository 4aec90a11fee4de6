//! Check definitions
//!
//! A [`CheckDefinition`] pairs a command template with a [`CheckProbe`]
//! that turns raw command output into a [`MetricValue`] and classifies it.
//! Definitions are built once per process and shared read-only by every
//! concurrent runner.

mod builtin;
pub mod parser;

use std::fmt;
use std::sync::Arc;

use crate::error::ParseError;
use crate::models::{MetricValue, TargetDescriptor, Verdict};

pub use builtin::{
    CommandProbe, CpuProbe, DiskProbe, LoadProbe, MemoryProbe, SERVICE_STATES, ServiceProbe,
    SwapProbe, Thresholds, UptimeProbe, service_command,
};

/// Parse and classify capability of a check
pub trait CheckProbe: Send + Sync + fmt::Debug {
    /// Turns raw command output into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the output cannot be interpreted.
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError>;

    /// Classifies a parsed value.
    ///
    /// A value of an unexpected variant classifies as [`Verdict::Unknown`].
    fn classify(&self, value: &MetricValue) -> Verdict;
}

/// A named unit of work executed against every target
#[derive(Debug, Clone)]
pub struct CheckDefinition {
    name: String,
    command_template: String,
    probe: Arc<dyn CheckProbe>,
}

impl CheckDefinition {
    /// Creates a check definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        command_template: impl Into<String>,
        probe: Arc<dyn CheckProbe>,
    ) -> Self {
        Self {
            name: name.into(),
            command_template: command_template.into(),
            probe,
        }
    }

    /// Replaces the name, keeping command and probe
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Unique name within a run
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command with `{target_id}`, `{host}` and `{port}` placeholders
    #[must_use]
    pub fn command_template(&self) -> &str {
        &self.command_template
    }

    /// The parse/classify capability
    #[must_use]
    pub fn probe(&self) -> &dyn CheckProbe {
        self.probe.as_ref()
    }

    /// Renders the command for one target
    #[must_use]
    pub fn render_command(&self, target: &TargetDescriptor) -> String {
        self.command_template
            .replace("{target_id}", &target.id)
            .replace("{host}", &target.host)
            .replace("{port}", &target.port.to_string())
    }

    /// Parses raw output and classifies the result.
    ///
    /// # Errors
    ///
    /// Returns the probe's [`ParseError`] unchanged.
    pub fn evaluate(&self, raw: &str) -> Result<(MetricValue, Verdict), ParseError> {
        let value = self.probe.parse(raw)?;
        let verdict = self.probe.classify(&value);
        Ok((value, verdict))
    }

    /// The built-in CPU check
    #[must_use]
    pub fn cpu(thresholds: Thresholds) -> Self {
        Self::new("cpu", parser::CPU_COMMAND, Arc::new(CpuProbe::new(thresholds)))
    }

    /// The built-in memory check
    #[must_use]
    pub fn memory(thresholds: Thresholds) -> Self {
        Self::new(
            "memory",
            parser::MEMINFO_COMMAND,
            Arc::new(MemoryProbe::new(thresholds)),
        )
    }

    /// The built-in swap check
    #[must_use]
    pub fn swap(thresholds: Thresholds) -> Self {
        Self::new(
            "swap",
            parser::MEMINFO_COMMAND,
            Arc::new(SwapProbe::new(thresholds)),
        )
    }

    /// The built-in disk check
    #[must_use]
    pub fn disk(thresholds: Thresholds) -> Self {
        Self::new("disk", parser::DF_COMMAND, Arc::new(DiskProbe::new(thresholds)))
    }

    /// The built-in load check
    #[must_use]
    pub fn load(thresholds: Thresholds) -> Self {
        Self::new(
            "load",
            parser::LOADAVG_COMMAND,
            Arc::new(LoadProbe::new(thresholds)),
        )
    }

    /// The built-in uptime check
    #[must_use]
    pub fn uptime(min_uptime_secs: Option<u64>) -> Self {
        Self::new(
            "uptime",
            parser::UPTIME_COMMAND,
            Arc::new(UptimeProbe::new(min_uptime_secs)),
        )
    }

    /// A `systemctl is-active` check for one unit
    #[must_use]
    pub fn service(name: impl Into<String>, unit: &str) -> Self {
        Self::new(name, service_command(unit), Arc::new(ServiceProbe))
    }

    /// The CPU, memory, swap, disk and uptime checks with stock thresholds
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::uptime(None),
            Self::cpu(Thresholds::CPU),
            Self::memory(Thresholds::MEMORY),
            Self::swap(Thresholds::SWAP),
            Self::disk(Thresholds::DISK),
        ]
    }
}
