//! Host check runner
//!
//! Executes every check definition against one target over one session and
//! always produces a [`HostResult`]. Nothing fails out of [`HostCheckRunner::run`]:
//! connection problems become an unreachable result, command and parse
//! problems become UNKNOWN checks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::Instrument;

use crate::checks::CheckDefinition;
use crate::config::RunSettings;
use crate::models::{CheckResult, ConnectionError, FailureKind, HostResult, TargetDescriptor};
use crate::orchestrator::{CancellationToken, StopReason};
use crate::session::{RemoteSession, SessionProvider};
use crate::trace_operation;
use crate::tracing::span_names;

/// Timeouts and limits applied to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Targets checked in parallel, at least 1
    pub concurrency: usize,
    /// Bound on opening a session
    pub connect_timeout: Duration,
    /// Bound on each check command
    pub command_timeout: Duration,
    /// Bound on one target, connection plus all checks
    pub target_timeout: Duration,
    /// Bound on the whole run
    pub run_deadline: Duration,
    /// Bound on closing a session
    pub close_timeout: Duration,
    /// Raw output bytes kept per check
    pub raw_output_limit: usize,
}

impl From<&RunSettings> for RunLimits {
    fn from(settings: &RunSettings) -> Self {
        Self {
            concurrency: settings.effective_concurrency(),
            connect_timeout: settings.connect_timeout(),
            command_timeout: settings.command_timeout(),
            target_timeout: settings.target_timeout(),
            run_deadline: settings.run_deadline(),
            close_timeout: settings.close_timeout(),
            raw_output_limit: settings.raw_output_limit,
        }
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self::from(&RunSettings::default())
    }
}

/// Why an operation was abandoned before completing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    TargetTimeout,
    Stopped(StopReason),
}

impl Interrupt {
    fn into_connection_error(self, target_timeout: Duration) -> ConnectionError {
        match self {
            Self::TargetTimeout => ConnectionError::new(
                FailureKind::Timeout,
                format!(
                    "Target did not finish within {}s",
                    target_timeout.as_secs_f64()
                ),
            ),
            Self::Stopped(StopReason::DeadlineExceeded) => ConnectionError::new(
                FailureKind::Timeout,
                "Run deadline exceeded before the target finished",
            ),
            Self::Stopped(StopReason::Cancelled) => {
                ConnectionError::new(FailureKind::Cancelled, "Run cancelled")
            }
        }
    }
}

/// Runs all checks against one target
#[derive(Clone)]
pub struct HostCheckRunner {
    provider: Arc<dyn SessionProvider>,
    checks: Arc<[CheckDefinition]>,
    limits: RunLimits,
}

impl std::fmt::Debug for HostCheckRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCheckRunner")
            .field("checks", &self.checks.len())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl HostCheckRunner {
    /// Creates a runner
    #[must_use]
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        checks: Arc<[CheckDefinition]>,
        limits: RunLimits,
    ) -> Self {
        Self {
            provider,
            checks,
            limits,
        }
    }

    /// Check definitions in execution order
    #[must_use]
    pub fn checks(&self) -> &[CheckDefinition] {
        &self.checks
    }

    /// Limits in effect
    #[must_use]
    pub const fn limits(&self) -> &RunLimits {
        &self.limits
    }

    /// Checks one target.
    ///
    /// Stops promptly when `stop` is cancelled or the per-target timeout
    /// elapses; either way the host is reported unreachable and any checks
    /// already run are discarded.
    pub async fn run(&self, target: &TargetDescriptor, stop: &CancellationToken) -> HostResult {
        let span = trace_operation!(
            span_names::HOST_CHECK,
            target_id = %target.id,
            host = %target.host,
            port = target.port,
            auth_method = target.auth.method.name(),
        );

        async move {
            let started_at = Utc::now();
            let deadline = Instant::now() + self.limits.target_timeout;

            let outcome = self.run_checks(target, deadline, stop).await;
            let finished_at = Utc::now();

            match outcome {
                Ok(checks) => {
                    tracing::info!(
                        checks = checks.len(),
                        duration_ms = (finished_at - started_at).num_milliseconds(),
                        "Host checked"
                    );
                    HostResult::reachable(&target.id, checks, started_at, finished_at)
                }
                Err(error) => {
                    tracing::warn!(
                        failure_kind = %error.kind,
                        error = %error.message,
                        "Host unreachable"
                    );
                    HostResult::unreachable(&target.id, error, started_at, finished_at)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_checks(
        &self,
        target: &TargetDescriptor,
        deadline: Instant,
        stop: &CancellationToken,
    ) -> Result<Vec<CheckResult>, ConnectionError> {
        let opened = guard(
            self.provider.open(target, self.limits.connect_timeout),
            deadline,
            stop,
        )
        .await
        .map_err(|i| i.into_connection_error(self.limits.target_timeout))?;

        let mut session = opened.map_err(ConnectionError::from)?;

        let mut results = Vec::with_capacity(self.checks.len());
        let mut interrupted = None;

        for check in self.checks.iter() {
            match self
                .run_check(check, target, session.as_mut(), deadline, stop)
                .await
            {
                Ok(result) => results.push(result),
                Err(interrupt) => {
                    interrupted = Some(interrupt);
                    break;
                }
            }
        }

        self.close(session.as_mut()).await;

        match interrupted {
            Some(interrupt) => Err(interrupt.into_connection_error(self.limits.target_timeout)),
            None => Ok(results),
        }
    }

    async fn run_check(
        &self,
        check: &CheckDefinition,
        target: &TargetDescriptor,
        session: &mut dyn RemoteSession,
        deadline: Instant,
        stop: &CancellationToken,
    ) -> Result<CheckResult, Interrupt> {
        let command = check.render_command(target);
        let output = guard(
            session.execute(&command, self.limits.command_timeout),
            deadline,
            stop,
        )
        .await?;

        let result = match output {
            Ok(raw) => {
                let excerpt = Some(truncate_output(&raw, self.limits.raw_output_limit));
                match check.evaluate(&raw) {
                    Ok((value, verdict)) => {
                        CheckResult::classified(check.name(), value, verdict, excerpt)
                    }
                    Err(e) => CheckResult::failed(check.name(), format!("Parse error: {e}"), excerpt),
                }
            }
            Err(e) => CheckResult::failed(check.name(), e.to_string(), None),
        };

        tracing::debug!(
            check = check.name(),
            verdict = %result.verdict,
            error = result.error.as_deref().unwrap_or(""),
            "Check finished"
        );

        Ok(result)
    }

    async fn close(&self, session: &mut dyn RemoteSession) {
        if tokio::time::timeout(self.limits.close_timeout, session.close())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_ms = self.limits.close_timeout.as_millis() as u64,
                "Session close timed out"
            );
        }
    }
}

/// Races `fut` against the per-target deadline and the stop token
async fn guard<F: Future>(
    fut: F,
    deadline: Instant,
    stop: &CancellationToken,
) -> Result<F::Output, Interrupt> {
    tokio::select! {
        biased;
        () = stop.cancelled() => Err(Interrupt::Stopped(
            stop.reason().unwrap_or(StopReason::Cancelled),
        )),
        () = tokio::time::sleep_until(deadline) => Err(Interrupt::TargetTimeout),
        output = fut => Ok(output),
    }
}

/// Truncates to at most `limit` bytes on a char boundary
fn truncate_output(raw: &str, limit: usize) -> String {
    if raw.len() <= limit {
        return raw.to_string();
    }
    let mut end = limit;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    raw[..end].to_string()
}
