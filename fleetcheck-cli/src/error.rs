//! CLI error types and exit codes.

use fleetcheck_core::{ConfigError, FleetCheckError, ReportError, TracingError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, or other setup errors
    pub const GENERAL_ERROR: i32 = 1;
    /// The run completed but at least one host is unreachable or critical
    pub const DEGRADED: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Report rendering or writing error
    #[error("Report error: {0}")]
    Report(String),

    /// Notification setup error
    #[error("Notification error: {0}")]
    Notify(String),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),

    /// The fleet needs attention
    #[error("Fleet degraded: {0}")]
    Degraded(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ReportError> for CliError {
    fn from(err: ReportError) -> Self {
        Self::Report(err.to_string())
    }
}

impl From<TracingError> for CliError {
    fn from(err: TracingError) -> Self {
        Self::Logging(err.to_string())
    }
}

impl From<FleetCheckError> for CliError {
    fn from(err: FleetCheckError) -> Self {
        match err {
            FleetCheckError::Config(e) => e.into(),
            FleetCheckError::Tracing(e) => e.into(),
            FleetCheckError::Io(e) => Self::Io(e),
            FleetCheckError::Delivery(e) => Self::Notify(e.to_string()),
            FleetCheckError::Serialization(e) => Self::Report(e.to_string()),
        }
    }
}

impl CliError {
    /// Returns the process exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Degraded(_) => exit_codes::DEGRADED,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
