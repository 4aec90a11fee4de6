//! Run, notification and SMTP settings
//!
//! Stored in the fleet configuration file under `[run]`, `[notify]` and
//! `[smtp]`. Every field has a default so an empty table is valid.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// How a run is executed (`[run]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSettings {
    /// Number of targets checked in parallel (default: 5)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Bound on opening a session (default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Bound on each check command (default: 10)
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Bound on one target, connection plus all checks (default: 120)
    #[serde(default = "default_target_timeout_secs")]
    pub target_timeout_secs: u64,
    /// Bound on the whole run (default: 600)
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,
    /// Bound on closing a session (default: 5)
    #[serde(default = "default_close_timeout_secs")]
    pub close_timeout_secs: u64,
    /// Raw output kept per check, in bytes (default: 4096)
    #[serde(default = "default_raw_output_limit")]
    pub raw_output_limit: usize,
}

const fn default_concurrency() -> usize {
    5
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_command_timeout_secs() -> u64 {
    10
}

const fn default_target_timeout_secs() -> u64 {
    120
}

const fn default_run_deadline_secs() -> u64 {
    600
}

const fn default_close_timeout_secs() -> u64 {
    5
}

const fn default_raw_output_limit() -> usize {
    4096
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            target_timeout_secs: default_target_timeout_secs(),
            run_deadline_secs: default_run_deadline_secs(),
            close_timeout_secs: default_close_timeout_secs(),
            raw_output_limit: default_raw_output_limit(),
        }
    }
}

impl RunSettings {
    /// Concurrency clamped to at least one worker
    #[must_use]
    pub const fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            1
        } else {
            self.concurrency
        }
    }

    /// Session open timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-command timeout
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Per-target timeout
    #[must_use]
    pub const fn target_timeout(&self) -> Duration {
        Duration::from_secs(self.target_timeout_secs)
    }

    /// Whole-run deadline
    #[must_use]
    pub const fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }

    /// Session close timeout
    #[must_use]
    pub const fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }

    /// Rejects zero timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSettings`] naming the offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        let fields = [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("command_timeout_secs", self.command_timeout_secs),
            ("target_timeout_secs", self.target_timeout_secs),
            ("run_deadline_secs", self.run_deadline_secs),
            ("close_timeout_secs", self.close_timeout_secs),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(ConfigError::InvalidSettings(format!(
                    "run.{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

/// Who gets notified (`[notify]`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifySettings {
    /// Fleet-wide summary recipients
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Fallback recipient for per-host alerts
    #[serde(default)]
    pub admin_contact: Option<String>,
    /// Recipients of the attention digest (hosts needing action only)
    #[serde(default)]
    pub director_recipients: Vec<String>,
    /// Send each admin contact a digest of their hosts
    #[serde(default)]
    pub admin_digests: bool,
}

/// SMTP relay used by the CLI to deliver notifications
///
/// Built from the `[smtp]` table after `${VAR}` references are resolved.
#[derive(Debug)]
pub struct SmtpSettings {
    /// Relay hostname
    pub server: String,
    /// Relay port (default: 587)
    pub port: u16,
    /// Login name
    pub username: Option<String>,
    /// Login password
    pub password: Option<SecretString>,
    /// Sender address
    pub from: String,
    /// Upgrade the connection with STARTTLS (default: true)
    pub starttls: bool,
}

/// Default SMTP submission port
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Resolves a whole-value `${VAR}` reference through `lookup`.
///
/// Values that are not exactly `${NAME}` are returned unchanged.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvVar`] if `lookup` has no value for `NAME`.
pub fn resolve_env_value<F>(value: &str, lookup: F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(name) if !name.is_empty() => {
            lookup(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        }
        _ => Ok(value.to_string()),
    }
}
