//! Remote command execution
//!
//! The runner depends only on [`SessionProvider`] and [`RemoteSession`]; how
//! a session authenticates and transports commands is up to the provider.
//! [`SshSessionProvider`] drives the system OpenSSH client.

mod port_check;
mod ssh;

use std::time::Duration;

use async_trait::async_trait;

use crate::models::TargetDescriptor;

pub use crate::error::{SessionError, SessionResult};
pub use crate::models::FailureKind;
pub use port_check::{PortCheckError, check_port_async};
pub use ssh::{SshOptions, SshSessionProvider, classify_ssh_failure};

/// An open session to one target
#[async_trait]
pub trait RemoteSession: Send {
    /// Runs `command` and returns its stdout.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] on timeout, non-zero exit status or
    /// transport failure.
    async fn execute(&mut self, command: &str, timeout: Duration) -> SessionResult<String>;

    /// Releases the session. Must be safe to call after a failed `execute`.
    async fn close(&mut self);
}

/// Opens sessions to targets
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Opens a session, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] classified as timeout, auth, unreachable,
    /// protocol or other.
    async fn open(
        &self,
        target: &TargetDescriptor,
        timeout: Duration,
    ) -> SessionResult<Box<dyn RemoteSession>>;
}
