//! Built-in check probes

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::CheckProbe;
use super::parser::OutputParser;
use crate::error::ParseError;
use crate::models::{MetricValue, Verdict};

/// States `systemctl is-active` can print
pub const SERVICE_STATES: &[&str] = &[
    "active",
    "reloading",
    "inactive",
    "failed",
    "activating",
    "deactivating",
    "maintenance",
    "refreshing",
    "unknown",
];

/// Command that prints the state of a systemd unit
///
/// `systemctl is-active` exits non-zero for anything but `active`; the
/// state is still on stdout, so the exit status is discarded.
#[must_use]
pub fn service_command(unit: &str) -> String {
    format!("systemctl is-active {unit} 2>/dev/null || true")
}

/// Warning and critical levels for a numeric metric
///
/// A value at or above `critical` is CRITICAL; at or above `warn`, WARN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// WARN at or above this value
    pub warn: f64,
    /// CRITICAL at or above this value
    pub critical: f64,
}

impl Thresholds {
    /// CPU busy percent
    pub const CPU: Self = Self::new(70.0, 90.0);
    /// Memory used percent
    pub const MEMORY: Self = Self::new(80.0, 90.0);
    /// Swap used percent
    pub const SWAP: Self = Self::new(20.0, 50.0);
    /// Fullest filesystem percent
    pub const DISK: Self = Self::new(80.0, 90.0);
    /// One-minute load average
    pub const LOAD: Self = Self::new(4.0, 8.0);

    /// Creates thresholds
    #[must_use]
    pub const fn new(warn: f64, critical: f64) -> Self {
        Self { warn, critical }
    }

    /// Classifies a value
    #[must_use]
    pub fn classify(&self, value: f64) -> Verdict {
        if value >= self.critical {
            Verdict::Critical
        } else if value >= self.warn {
            Verdict::Warn
        } else {
            Verdict::Ok
        }
    }

    /// Checks that both levels are finite, non-negative and ordered.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !self.warn.is_finite() || !self.critical.is_finite() {
            return Err("thresholds must be finite numbers".to_string());
        }
        if self.warn < 0.0 || self.critical < 0.0 {
            return Err("thresholds must not be negative".to_string());
        }
        if self.warn > self.critical {
            return Err(format!(
                "warn threshold {} is above critical threshold {}",
                self.warn, self.critical
            ));
        }
        Ok(())
    }

    fn classify_metric(&self, value: &MetricValue) -> Verdict {
        value
            .as_f64()
            .filter(|v| v.is_finite())
            .map_or(Verdict::Unknown, |v| self.classify(v))
    }
}

/// CPU busy percentage from two `/proc/stat` samples
#[derive(Debug, Clone)]
pub struct CpuProbe {
    thresholds: Thresholds,
}

impl CpuProbe {
    /// Creates the probe
    #[must_use]
    pub const fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl CheckProbe for CpuProbe {
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError> {
        OutputParser::parse_cpu_samples(raw).map(MetricValue::percent)
    }

    fn classify(&self, value: &MetricValue) -> Verdict {
        self.thresholds.classify_metric(value)
    }
}

/// Used memory percentage from `/proc/meminfo`
#[derive(Debug, Clone)]
pub struct MemoryProbe {
    thresholds: Thresholds,
}

impl MemoryProbe {
    /// Creates the probe
    #[must_use]
    pub const fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl CheckProbe for MemoryProbe {
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError> {
        OutputParser::parse_meminfo(raw).map(|m| MetricValue::percent(m.used_percent()))
    }

    fn classify(&self, value: &MetricValue) -> Verdict {
        self.thresholds.classify_metric(value)
    }
}

/// Used swap percentage from `/proc/meminfo`; a host without swap reads 0 %
#[derive(Debug, Clone)]
pub struct SwapProbe {
    thresholds: Thresholds,
}

impl SwapProbe {
    /// Creates the probe
    #[must_use]
    pub const fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl CheckProbe for SwapProbe {
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError> {
        OutputParser::parse_meminfo(raw).map(|m| MetricValue::percent(m.swap_used_percent()))
    }

    fn classify(&self, value: &MetricValue) -> Verdict {
        self.thresholds.classify_metric(value)
    }
}

/// Fullest real filesystem from `df -Pk`
#[derive(Debug, Clone)]
pub struct DiskProbe {
    thresholds: Thresholds,
}

impl DiskProbe {
    /// Creates the probe
    #[must_use]
    pub const fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl CheckProbe for DiskProbe {
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError> {
        OutputParser::worst_disk(raw).map(|d| MetricValue::percent(f64::from(d.used_percent)))
    }

    fn classify(&self, value: &MetricValue) -> Verdict {
        self.thresholds.classify_metric(value)
    }
}

/// One-minute load average
#[derive(Debug, Clone)]
pub struct LoadProbe {
    thresholds: Thresholds,
}

impl LoadProbe {
    /// Creates the probe
    #[must_use]
    pub const fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl CheckProbe for LoadProbe {
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError> {
        OutputParser::parse_loadavg(raw).map(|l| MetricValue::numeric(l, "load"))
    }

    fn classify(&self, value: &MetricValue) -> Verdict {
        self.thresholds.classify_metric(value)
    }
}

/// Time since boot; WARN below `min_uptime_secs` (recent reboot)
#[derive(Debug, Clone, Default)]
pub struct UptimeProbe {
    min_uptime_secs: Option<u64>,
}

impl UptimeProbe {
    /// Creates the probe
    #[must_use]
    pub const fn new(min_uptime_secs: Option<u64>) -> Self {
        Self { min_uptime_secs }
    }
}

impl CheckProbe for UptimeProbe {
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError> {
        OutputParser::parse_uptime(raw).map(|seconds| MetricValue::Duration { seconds })
    }

    fn classify(&self, value: &MetricValue) -> Verdict {
        match (value.as_seconds(), self.min_uptime_secs) {
            (None, _) => Verdict::Unknown,
            (Some(secs), Some(min)) if secs < min => Verdict::Warn,
            (Some(_), _) => Verdict::Ok,
        }
    }
}

/// State of a systemd unit; only `active` is OK
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceProbe;

impl CheckProbe for ServiceProbe {
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError> {
        let state = raw.lines().next().unwrap_or("").trim();
        if SERVICE_STATES.contains(&state) {
            Ok(MetricValue::Text {
                value: state.to_string(),
            })
        } else {
            Err(ParseError::new(format!("Unrecognized service state '{state}'")))
        }
    }

    fn classify(&self, value: &MetricValue) -> Verdict {
        match value {
            MetricValue::Text { value } if value == "active" => Verdict::Ok,
            MetricValue::Text { .. } => Verdict::Critical,
            _ => Verdict::Unknown,
        }
    }
}

/// Matches custom command output against a pattern
#[derive(Debug, Clone)]
pub struct CommandProbe {
    pattern: Regex,
    on_mismatch: Verdict,
}

impl CommandProbe {
    /// Creates the probe
    #[must_use]
    pub const fn new(pattern: Regex, on_mismatch: Verdict) -> Self {
        Self {
            pattern,
            on_mismatch,
        }
    }
}

impl CheckProbe for CommandProbe {
    fn parse(&self, raw: &str) -> Result<MetricValue, ParseError> {
        Ok(MetricValue::Boolean {
            value: self.pattern.is_match(raw),
        })
    }

    fn classify(&self, value: &MetricValue) -> Verdict {
        match value.as_bool() {
            Some(true) => Verdict::Ok,
            Some(false) => self.on_mismatch,
            None => Verdict::Unknown,
        }
    }
}
