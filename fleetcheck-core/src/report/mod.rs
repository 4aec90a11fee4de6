//! Report projections
//!
//! Pure functions from [`HostResult`] and [`FleetResult`] to JSON, plain text
//! and HTML. Output depends only on the input data: the same result always
//! renders to the same bytes for a given format and [`FORMAT_VERSION`].

mod html;
mod json;
mod text;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::models::{FleetResult, HostResult};

pub use html::{escape_html, render_fleet_attention_html, render_fleet_html, render_host_html};
pub use json::{
    FleetReport, HostReport, decode_fleet_json, decode_host_json, render_fleet_json,
    render_host_json,
};
pub use text::{render_fleet_text, render_host_text};

/// Version of the report layout; bumped on any change to rendered output
pub const FORMAT_VERSION: u32 = 1;

/// Raw output bytes shown in text and HTML reports
pub const EXCERPT_LIMIT: usize = 512;

/// Errors produced by report encoding and decoding
#[derive(Debug, Error)]
pub enum ReportError {
    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A decoded report was written by a newer layout
    #[error("Unsupported report format version: {0} (current: {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Report encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// Lossless JSON
    Json,
    /// Plain-text summary
    Text,
    /// HTML summary
    Html,
}

impl ReportFormat {
    /// File extension without the dot
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
            Self::Html => "html",
        }
    }

    /// MIME type used for attachments
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            other => Err(format!("Unknown report format '{other}'")),
        }
    }
}

/// Renders one host in `format`.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if JSON encoding fails.
pub fn render_host(result: &HostResult, format: ReportFormat) -> ReportResult<String> {
    match format {
        ReportFormat::Json => render_host_json(result),
        ReportFormat::Text => Ok(render_host_text(result)),
        ReportFormat::Html => Ok(render_host_html(result)),
    }
}

/// Renders the fleet in `format`.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if JSON encoding fails.
pub fn render_fleet(result: &FleetResult, format: ReportFormat) -> ReportResult<String> {
    match format {
        ReportFormat::Json => render_fleet_json(result),
        ReportFormat::Text => Ok(render_fleet_text(result)),
        ReportFormat::Html => Ok(render_fleet_html(result)),
    }
}

/// Bounded raw-output excerpt, cut on a char boundary
pub(crate) fn excerpt(raw: &str) -> (&str, bool) {
    if raw.len() <= EXCERPT_LIMIT {
        return (raw, false);
    }
    let mut end = EXCERPT_LIMIT;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    (&raw[..end], true)
}

/// Duration in seconds with millisecond precision
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let ms = duration.num_milliseconds().max(0);
    format!("{}.{:03}s", ms / 1000, ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse_and_extension() {
        assert_eq!("JSON".parse::<ReportFormat>(), Ok(ReportFormat::Json));
        assert_eq!("txt".parse::<ReportFormat>(), Ok(ReportFormat::Text));
        assert!("pdf".parse::<ReportFormat>().is_err());
        assert_eq!(ReportFormat::Html.extension(), "html");
    }

    #[test]
    fn test_excerpt_is_bounded() {
        let long = "x".repeat(EXCERPT_LIMIT * 2);
        let (cut, truncated) = excerpt(&long);
        assert_eq!(cut.len(), EXCERPT_LIMIT);
        assert!(truncated);
        assert_eq!(excerpt("short"), ("short", false));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(
            format_duration(chrono::Duration::milliseconds(1234)),
            "1.234s"
        );
        assert_eq!(format_duration(chrono::Duration::milliseconds(-5)), "0.000s");
    }
}
