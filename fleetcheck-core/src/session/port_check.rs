//! TCP reachability probe
//!
//! Run before spawning `ssh` so that dead hosts fail fast with a clear
//! unreachable/timeout classification instead of an opaque exit status.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::error::SessionError;
use crate::models::FailureKind;

/// Error type for port check operations
#[derive(Debug, Error)]
pub enum PortCheckError {
    /// Host resolution failed
    #[error("Failed to resolve host '{host}': {reason}")]
    ResolutionFailed {
        /// The hostname that failed to resolve
        host: String,
        /// The reason for the failure
        reason: String,
    },
    /// Connection refused or otherwise failed
    #[error("Port {port} on '{host}' is not reachable: {reason}")]
    Unreachable {
        /// The hostname that was unreachable
        host: String,
        /// The port that was unreachable
        port: u16,
        /// The reason for the failure
        reason: String,
    },
    /// No address answered in time
    #[error("Port {port} on '{host}' did not answer within {}s", timeout.as_secs())]
    TimedOut {
        /// The hostname
        host: String,
        /// The port
        port: u16,
        /// Probe timeout
        timeout: Duration,
    },
}

impl From<PortCheckError> for SessionError {
    fn from(err: PortCheckError) -> Self {
        let kind = match err {
            PortCheckError::TimedOut { .. } => FailureKind::Timeout,
            PortCheckError::ResolutionFailed { .. } | PortCheckError::Unreachable { .. } => {
                FailureKind::Unreachable
            }
        };
        Self::new(kind, err.to_string())
    }
}

/// Checks that a TCP port accepts connections
///
/// Every resolved address is tried in turn, each bounded by `timeout`.
///
/// # Errors
/// * `PortCheckError::ResolutionFailed` if the hostname cannot be resolved
/// * `PortCheckError::TimedOut` if no address answered and the last attempt timed out
/// * `PortCheckError::Unreachable` if every address refused or failed
pub async fn check_port_async(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<(), PortCheckError> {
    let addrs: Vec<SocketAddr> = tokio::time::timeout(timeout, tokio::net::lookup_host((host, port)))
        .await
        .map_err(|_| PortCheckError::ResolutionFailed {
            host: host.to_string(),
            reason: "Name resolution timed out".to_string(),
        })?
        .map_err(|e| PortCheckError::ResolutionFailed {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(PortCheckError::ResolutionFailed {
            host: host.to_string(),
            reason: "No addresses found".to_string(),
        });
    }

    let mut last_error = None;
    for addr in addrs {
        match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => return Ok(()),
            Ok(Err(e)) => {
                last_error = Some(PortCheckError::Unreachable {
                    host: host.to_string(),
                    port,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                last_error = Some(PortCheckError::TimedOut {
                    host: host.to_string(),
                    port,
                    timeout,
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| PortCheckError::Unreachable {
        host: host.to_string(),
        port,
        reason: "No address attempted".to_string(),
    }))
}
