//! OpenSSH session provider
//!
//! Runs commands through the system `ssh` client (or `sshpass -e ssh` for
//! password authentication). A session is an OpenSSH control master: `open`
//! establishes it with a no-op command, every `execute` multiplexes over the
//! same connection, and `close` asks the master to exit.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use uuid::Uuid;

use super::port_check::check_port_async;
use super::{RemoteSession, SessionProvider};
use crate::error::{SessionError, SessionResult};
use crate::models::{AuthMethod, DEFAULT_SSH_PORT, FailureKind, TargetDescriptor};

/// `sshpass` exit status for a rejected password
const SSHPASS_BAD_PASSWORD: i32 = 5;
/// `sshpass` exit status for an unknown host key
const SSHPASS_HOST_KEY_UNKNOWN: i32 = 6;
/// `ssh` exit status for its own (transport) errors
const SSH_TRANSPORT_ERROR: i32 = 255;

/// Options shared by every session the provider opens
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Directory holding control sockets
    pub control_dir: PathBuf,
    /// How long an idle control master lingers after the last command
    pub control_persist_secs: u64,
    /// Bound on `ssh -O exit` at close
    pub close_timeout: Duration,
    /// Pass `StrictHostKeyChecking=no`
    pub accept_unknown_host_keys: bool,
    /// Probe the TCP port before spawning `ssh`
    pub tcp_probe: bool,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            control_dir: dirs::runtime_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("fleetcheck"),
            control_persist_secs: 60,
            close_timeout: Duration::from_secs(5),
            accept_unknown_host_keys: true,
            tcp_probe: true,
        }
    }
}

/// Opens OpenSSH control-master sessions
#[derive(Debug, Clone, Default)]
pub struct SshSessionProvider {
    options: SshOptions,
}

impl SshSessionProvider {
    /// Creates a provider
    #[must_use]
    pub const fn new(options: SshOptions) -> Self {
        Self { options }
    }

    /// Provider options
    #[must_use]
    pub const fn options(&self) -> &SshOptions {
        &self.options
    }
}

#[async_trait]
impl SessionProvider for SshSessionProvider {
    async fn open(
        &self,
        target: &TargetDescriptor,
        timeout: Duration,
    ) -> SessionResult<Box<dyn RemoteSession>> {
        if self.options.tcp_probe {
            check_port_async(&target.host, target.port, timeout).await?;
        }

        tokio::fs::create_dir_all(&self.options.control_dir)
            .await
            .map_err(|e| {
                SessionError::other(format!(
                    "Cannot create control socket directory {}: {e}",
                    self.options.control_dir.display()
                ))
            })?;

        let password = match &target.auth.method {
            AuthMethod::PasswordEnv(var) => Some(read_password(var)?),
            AuthMethod::Agent | AuthMethod::KeyFile(_) => None,
        };

        let mut session = SshSession {
            destination: target.auth.user.as_ref().map_or_else(
                || target.host.clone(),
                |user| format!("{user}@{}", target.host),
            ),
            port: target.port,
            identity_file: match &target.auth.method {
                AuthMethod::KeyFile(path) => Some(path.clone()),
                _ => None,
            },
            password,
            control_path: control_path(&self.options.control_dir),
            options: self.options.clone(),
            open: false,
        };

        tracing::debug!(
            target_id = %target.id,
            auth_method = target.auth.method.name(),
            "Opening SSH control master"
        );

        let connect_secs = timeout.as_secs().max(1);
        let pending = PendingMaster::new(&session);
        session.run("true", timeout, Some(connect_secs)).await?;
        pending.disarm();
        session.open = true;

        Ok(Box::new(session))
    }
}

/// One control-master connection
struct SshSession {
    destination: String,
    port: u16,
    identity_file: Option<PathBuf>,
    password: Option<SecretString>,
    control_path: PathBuf,
    options: SshOptions,
    open: bool,
}

impl SshSession {
    /// Builds the `ssh` invocation shared by every operation on this session
    fn base_command(&self, connect_timeout_secs: Option<u64>) -> Command {
        let mut cmd;

        if let Some(password) = &self.password {
            cmd = Command::new("sshpass");
            cmd.arg("-e").arg("ssh");
            cmd.env("SSHPASS", password.expose_secret());
        } else {
            cmd = Command::new("ssh");
            cmd.arg("-o").arg("BatchMode=yes");
        }

        if self.options.accept_unknown_host_keys {
            cmd.arg("-o").arg("StrictHostKeyChecking=no");
        }
        if let Some(secs) = connect_timeout_secs {
            cmd.arg("-o").arg(format!("ConnectTimeout={secs}"));
        }
        cmd.arg("-o").arg("ControlMaster=auto");
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()));
        cmd.arg("-o")
            .arg(format!("ControlPersist={}", self.options.control_persist_secs));

        if self.port != DEFAULT_SSH_PORT {
            cmd.arg("-p").arg(self.port.to_string());
        }
        if let Some(key) = &self.identity_file {
            cmd.arg("-i").arg(key);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    /// `ssh -O exit` for this session's control socket
    fn exit_command(&self) -> Command {
        let mut cmd = self.base_command(None);
        cmd.arg("-O").arg("exit").arg(&self.destination);
        cmd
    }

    /// Whether a control master has bound this session's socket
    fn has_control_socket(&self) -> bool {
        self.control_path.exists()
    }

    async fn run(
        &self,
        command: &str,
        timeout: Duration,
        connect_timeout_secs: Option<u64>,
    ) -> SessionResult<String> {
        let mut cmd = self.base_command(connect_timeout_secs);
        cmd.arg(&self.destination).arg(command);

        tracing::trace!(destination = %self.destination, command, "ssh exec");

        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                if output.status.success() {
                    String::from_utf8(output.stdout)
                        .map_err(|e| SessionError::other(format!("Invalid UTF-8 in output: {e}")))
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(classify_ssh_failure(
                        output.status.code(),
                        stderr.trim(),
                        self.password.is_some(),
                    ))
                }
            }
            Ok(Err(e)) => Err(SessionError::other(format!(
                "Failed to spawn SSH process: {e}"
            ))),
            Err(_) => Err(SessionError::timeout(format!(
                "Command timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn execute(&mut self, command: &str, timeout: Duration) -> SessionResult<String> {
        if !self.open {
            return Err(SessionError::new(
                FailureKind::Protocol,
                "Session is closed",
            ));
        }
        self.run(command, timeout, None).await
    }

    async fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let mut cmd = self.exit_command();

        match tokio::time::timeout(self.options.close_timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                tracing::trace!(destination = %self.destination, "Control master closed");
            }
            Ok(Ok(output)) => {
                tracing::debug!(
                    destination = %self.destination,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "Control master exit request failed"
                );
            }
            Ok(Err(e)) => {
                tracing::debug!(destination = %self.destination, error = %e, "Cannot spawn ssh -O exit");
            }
            Err(_) => {
                tracing::debug!(destination = %self.destination, "ssh -O exit timed out");
            }
        }
    }
}

/// Stops a control master left behind when `open` does not complete
///
/// `ssh` backgrounds the master as soon as it authenticates, so killing the
/// foreground client on timeout or cancellation does not stop it. Dropping
/// an armed guard sends a detached `ssh -O exit` for the socket, if one was
/// bound. No exit request is sent outside a Tokio runtime.
struct PendingMaster<'a> {
    session: &'a SshSession,
    armed: bool,
}

impl<'a> PendingMaster<'a> {
    const fn new(session: &'a SshSession) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    /// The master is owned by an open session from here on
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingMaster<'_> {
    fn drop(&mut self) {
        if !self.armed || !self.session.has_control_socket() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }

        let mut cmd = self.session.exit_command();
        cmd.kill_on_drop(false);
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        // The child is reaped by the runtime once dropped
        match cmd.spawn() {
            Ok(_) => tracing::debug!(
                destination = %self.session.destination,
                "Stopping control master of an unfinished open"
            ),
            Err(e) => tracing::debug!(
                destination = %self.session.destination,
                error = %e,
                "Cannot spawn ssh -O exit"
            ),
        }
    }
}

fn read_password(var: &str) -> SessionResult<SecretString> {
    std::env::var(var).map(SecretString::from).map_err(|_| {
        SessionError::new(
            FailureKind::Auth,
            format!("Password variable '{var}' is not set"),
        )
    })
}

/// A short, unique control socket path (sockets are limited to ~104 bytes)
fn control_path(dir: &Path) -> PathBuf {
    let id = Uuid::new_v4().simple().to_string();
    dir.join(format!("cm-{}", &id[..12]))
}

/// Maps a failed `ssh`/`sshpass` exit to a [`FailureKind`]
///
/// A non-zero status other than ssh's own 255 is the remote command's exit
/// status and classifies as [`FailureKind::Other`].
#[must_use]
pub fn classify_ssh_failure(code: Option<i32>, stderr: &str, via_sshpass: bool) -> SessionError {
    let detail = if stderr.is_empty() {
        "no diagnostic output".to_string()
    } else {
        stderr.to_string()
    };

    if via_sshpass {
        match code {
            Some(SSHPASS_BAD_PASSWORD) => {
                return SessionError::new(FailureKind::Auth, "Password rejected");
            }
            Some(SSHPASS_HOST_KEY_UNKNOWN) => {
                return SessionError::new(FailureKind::Protocol, "Host key is unknown");
            }
            _ => {}
        }
    }

    let Some(status) = code else {
        return SessionError::other(format!("SSH process was terminated: {detail}"));
    };

    if status != SSH_TRANSPORT_ERROR {
        return SessionError::other(format!("Command failed (exit {status}): {detail}"));
    }

    let lower = stderr.to_lowercase();
    let kind = if lower.contains("permission denied")
        || lower.contains("authentication failed")
        || lower.contains("too many authentication failures")
    {
        FailureKind::Auth
    } else if lower.contains("timed out") {
        FailureKind::Timeout
    } else if lower.contains("could not resolve")
        || lower.contains("name or service not known")
        || lower.contains("no route to host")
        || lower.contains("connection refused")
        || lower.contains("network is unreachable")
    {
        FailureKind::Unreachable
    } else if lower.contains("kex_exchange_identification")
        || lower.contains("protocol")
        || lower.contains("connection closed by")
        || lower.contains("host key verification failed")
        || lower.contains("broken pipe")
    {
        FailureKind::Protocol
    } else {
        FailureKind::Other
    };

    SessionError::new(kind, format!("SSH failed: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_failure() {
        let err = classify_ssh_failure(
            Some(255),
            "ops@10.0.0.5: Permission denied (publickey,password).",
            false,
        );
        assert_eq!(err.kind, FailureKind::Auth);
    }

    #[test]
    fn test_classify_transport_failures() {
        let cases = [
            (
                "ssh: connect to host 10.0.0.9 port 22: Connection timed out",
                FailureKind::Timeout,
            ),
            (
                "ssh: Could not resolve hostname nope: Name or service not known",
                FailureKind::Unreachable,
            ),
            (
                "ssh: connect to host 10.0.0.9 port 22: No route to host",
                FailureKind::Unreachable,
            ),
            (
                "kex_exchange_identification: read: Connection reset by peer",
                FailureKind::Protocol,
            ),
            ("something odd happened", FailureKind::Other),
        ];
        for (stderr, kind) in cases {
            assert_eq!(classify_ssh_failure(Some(255), stderr, false).kind, kind, "{stderr}");
        }
    }

    #[test]
    fn test_remote_exit_status_is_other() {
        let err = classify_ssh_failure(Some(1), "df: cannot read table of mounted file systems", false);
        assert_eq!(err.kind, FailureKind::Other);
        assert!(err.message.contains("exit 1"));
    }

    #[test]
    fn test_sshpass_exit_codes() {
        assert_eq!(classify_ssh_failure(Some(5), "", true).kind, FailureKind::Auth);
        assert_eq!(classify_ssh_failure(Some(6), "", true).kind, FailureKind::Protocol);
        assert_eq!(classify_ssh_failure(Some(5), "", false).kind, FailureKind::Other);
    }

    #[test]
    fn test_control_path_is_short_and_unique() {
        let dir = Path::new("/run/user/1000/fleetcheck");
        let a = control_path(dir);
        let b = control_path(dir);
        assert_ne!(a, b);
        assert!(a.as_os_str().len() < 100);
    }

    fn session_at(control_path: PathBuf) -> SshSession {
        SshSession {
            destination: "ops@10.0.0.5".into(),
            port: 2222,
            identity_file: None,
            password: None,
            control_path,
            options: SshOptions::default(),
            open: false,
        }
    }

    #[test]
    fn test_exit_command_targets_control_socket() {
        let session = session_at(PathBuf::from("/tmp/fleetcheck/cm-0123456789ab"));
        let cmd = session.exit_command();
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(cmd.as_std().get_program(), "ssh");
        assert!(args.contains(&"ControlPath=/tmp/fleetcheck/cm-0123456789ab".to_string()));
        assert_eq!(
            &args[args.len() - 3..],
            &["-O".to_string(), "exit".to_string(), "ops@10.0.0.5".to_string()]
        );
    }

    #[test]
    fn test_control_socket_detection() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_at(dir.path().join("cm-0123456789ab"));
        assert!(!session.has_control_socket());

        std::fs::write(&session.control_path, b"").unwrap();
        assert!(session.has_control_socket());
    }

    #[tokio::test]
    async fn test_unfinished_open_without_socket_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_at(dir.path().join("cm-0123456789ab"));

        drop(PendingMaster::new(&session));
        PendingMaster::new(&session).disarm();

        assert!(!session.has_control_socket());
    }

    #[test]
    fn test_unfinished_open_outside_runtime_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_at(dir.path().join("cm-0123456789ab"));
        std::fs::write(&session.control_path, b"").unwrap();

        drop(PendingMaster::new(&session));
    }

    #[test]
    fn test_missing_password_variable_is_auth_failure() {
        let err = read_password("FLEETCHECK_TEST_UNSET_PASSWORD_VARIABLE").unwrap_err();
        assert_eq!(err.kind, FailureKind::Auth);
        assert!(!err.message.contains("secret"));
    }
}
