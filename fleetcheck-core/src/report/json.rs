//! Lossless JSON projection
//!
//! Every report is wrapped in a versioned envelope. The fleet envelope also
//! carries the derived [`FleetSummary`] for consumers that do not want to
//! recompute it.

use serde::{Deserialize, Serialize};

use super::{FORMAT_VERSION, ReportError, ReportResult};
use crate::models::{FleetResult, FleetSummary, HostResult};

/// Serialized form of one host report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostReport {
    /// Layout version
    pub format_version: u32,
    /// The host result, unchanged
    pub host: HostResult,
}

/// Serialized form of a fleet report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetReport {
    /// Layout version
    pub format_version: u32,
    /// Counts derived from `fleet`
    pub summary: FleetSummary,
    /// The fleet result, unchanged
    pub fleet: FleetResult,
}

#[derive(Serialize)]
struct HostReportRef<'a> {
    format_version: u32,
    host: &'a HostResult,
}

#[derive(Serialize)]
struct FleetReportRef<'a> {
    format_version: u32,
    summary: FleetSummary,
    fleet: &'a FleetResult,
}

/// Encodes one host as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if serialization fails.
pub fn render_host_json(result: &HostResult) -> ReportResult<String> {
    let report = HostReportRef {
        format_version: FORMAT_VERSION,
        host: result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Encodes the fleet as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if serialization fails.
pub fn render_fleet_json(result: &FleetResult) -> ReportResult<String> {
    let report = FleetReportRef {
        format_version: FORMAT_VERSION,
        summary: result.summary(),
        fleet: result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Decodes a host report.
///
/// # Errors
///
/// Returns [`ReportError::Json`] for malformed input and
/// [`ReportError::UnsupportedVersion`] for reports from a newer layout.
pub fn decode_host_json(json: &str) -> ReportResult<HostResult> {
    let report: HostReport = serde_json::from_str(json)?;
    check_version(report.format_version)?;
    Ok(report.host)
}

/// Decodes a fleet report.
///
/// # Errors
///
/// Returns [`ReportError::Json`] for malformed input and
/// [`ReportError::UnsupportedVersion`] for reports from a newer layout.
pub fn decode_fleet_json(json: &str) -> ReportResult<FleetResult> {
    let report: FleetReport = serde_json::from_str(json)?;
    check_version(report.format_version)?;
    Ok(report.fleet)
}

const fn check_version(version: u32) -> ReportResult<()> {
    if version > FORMAT_VERSION {
        return Err(ReportError::UnsupportedVersion(version));
    }
    Ok(())
}
