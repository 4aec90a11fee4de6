//! Error types for fleet checks
//!
//! Only configuration errors abort a run. Session and parse failures are
//! folded into [`HostResult`](crate::models::HostResult) and
//! [`CheckResult`](crate::models::CheckResult) values by the runner.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{ConnectionError, FailureKind};
use crate::tracing::TracingError;

/// Errors raised while loading or validating fleet configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The run was given no targets
    #[error("No targets configured")]
    NoTargets,

    /// Two targets share an id
    #[error("Duplicate target id '{0}'")]
    DuplicateTargetId(String),

    /// The run was given no checks
    #[error("No checks configured")]
    NoChecks,

    /// Two checks share a name
    #[error("Duplicate check name '{0}'")]
    DuplicateCheckName(String),

    /// A check definition is malformed
    #[error("Invalid check '{name}': {reason}")]
    InvalidCheck {
        /// Check name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// A target definition is malformed
    #[error("Invalid target '{id}': {reason}")]
    InvalidTarget {
        /// Target id
        id: String,
        /// What is wrong with it
        reason: String,
    },

    /// A run or notification setting is out of range
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// The configuration file extension is not recognized
    #[error("Unsupported configuration format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The configuration file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be deserialized
    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        /// `toml`, `yaml` or `json`
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// A `${VAR}` reference names an unset environment variable
    #[error("Environment variable '{0}' is not set")]
    MissingEnvVar(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure of a remote session operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SessionError {
    /// Failure category
    pub kind: FailureKind,
    /// Detail
    pub message: String,
}

impl SessionError {
    /// Creates a session error
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Timeout failure
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    /// Catch-all failure
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other, message)
    }
}

impl From<SessionError> for ConnectionError {
    fn from(err: SessionError) -> Self {
        Self::new(err.kind, err.message)
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// A check parser could not interpret command output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    /// Creates a parse error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Notification sink failure
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The intent could not be turned into a message
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The transport rejected or failed to send the message
    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Crate-wide error
#[derive(Debug, Error)]
pub enum FleetCheckError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Notification delivery error
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Logging setup error
    #[error(transparent)]
    Tracing(#[from] TracingError),

    /// I/O error while writing reports
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for crate-wide operations
pub type FleetCheckResult<T> = Result<T, FleetCheckError>;
