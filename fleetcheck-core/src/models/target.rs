//! Monitored host descriptors.
//!
//! A [`TargetDescriptor`] is built once from configuration and then shared
//! read-only by every runner for the duration of a single run.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// How a session authenticates against a target.
///
/// Only the method *name* is ever logged; key paths and password variables
/// stay out of logs and reports.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthMethod {
    /// Keys offered by the local SSH agent
    #[default]
    Agent,
    /// Private key file on the local filesystem
    KeyFile(PathBuf),
    /// Password read from the named environment variable when a session opens
    PasswordEnv(String),
}

impl AuthMethod {
    /// Short, log-safe name of the method
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::KeyFile(_) => "key-file",
            Self::PasswordEnv(_) => "password-env",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent => f.write_str("Agent"),
            Self::KeyFile(_) => f.write_str("KeyFile(<redacted>)"),
            Self::PasswordEnv(_) => f.write_str("PasswordEnv(<redacted>)"),
        }
    }
}

/// Opaque credential handle attached to a target
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthRef {
    /// Remote login name; `None` lets the transport pick its default
    pub user: Option<String>,
    /// Authentication method
    pub method: AuthMethod,
}

impl AuthRef {
    /// Agent authentication as the given user
    #[must_use]
    pub fn agent(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            method: AuthMethod::Agent,
        }
    }
}

impl fmt::Debug for AuthRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRef")
            .field("user", &self.user)
            .field("method", &self.method.name())
            .finish()
    }
}

/// One monitored remote host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetDescriptor {
    /// Unique identifier, stable across runs
    pub id: String,
    /// Hostname or IP address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Credential handle
    #[serde(skip)]
    pub auth: AuthRef,
    /// Free-form tags used for filtering
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Overrides the fleet-wide alert recipient for this host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_contact: Option<String>,
    /// Human-friendly name shown in reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TargetDescriptor {
    /// Creates a target on the default SSH port with agent authentication
    #[must_use]
    pub fn new(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            auth: AuthRef::default(),
            tags: BTreeSet::new(),
            admin_contact: None,
            label: None,
        }
    }

    /// Sets the port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the credential handle
    #[must_use]
    pub fn with_auth(mut self, auth: AuthRef) -> Self {
        self.auth = auth;
        self
    }

    /// Adds a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Sets the admin contact
    #[must_use]
    pub fn with_admin_contact(mut self, contact: impl Into<String>) -> Self {
        self.admin_contact = Some(contact.into());
        self
    }

    /// Sets the display label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label for reports, falling back to the host
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.host)
    }

    /// `host:port`, as shown in reports
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if the target carries `tag`
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Returns the targets carrying `tag`, preserving order
#[must_use]
pub fn filter_by_tag(targets: &[TargetDescriptor], tag: &str) -> Vec<TargetDescriptor> {
    targets.iter().filter(|t| t.has_tag(tag)).cloned().collect()
}
