//! Concurrent fleet orchestration
//!
//! A bounded pool of workers pulls targets from a shared queue and runs a
//! [`HostCheckRunner`] for each. Completed [`HostResult`]s flow over a channel
//! to a single collector, which alone builds the [`FleetResult`]. The
//! collector also enforces the run deadline and external cancellation by
//! raising a stop signal every runner watches.

mod cancel;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::checks::CheckDefinition;
use crate::error::{ConfigError, ConfigResult};
use crate::models::{
    ConnectionError, FailureKind, FleetResult, HostResult, TargetDescriptor,
};
use crate::notify::report_name;
use crate::report::ReportFormat;
use crate::runner::{HostCheckRunner, RunLimits};
use crate::session::SessionProvider;
use crate::trace_operation;
use crate::tracing::span_names;

pub use cancel::{CancellationToken, StopReason};

/// Rejects an empty target list, duplicate ids and ids whose report file
/// names collide.
///
/// # Errors
///
/// Returns [`ConfigError::NoTargets`], [`ConfigError::DuplicateTargetId`] or
/// [`ConfigError::InvalidTarget`].
pub fn validate_targets(targets: &[TargetDescriptor]) -> ConfigResult<()> {
    if targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }
    let mut seen = HashSet::with_capacity(targets.len());
    let mut file_names: HashMap<String, &str> = HashMap::with_capacity(targets.len());
    for target in targets {
        if target.id.trim().is_empty() {
            return Err(ConfigError::InvalidTarget {
                id: target.id.clone(),
                reason: "id must not be empty".to_string(),
            });
        }
        if !seen.insert(target.id.as_str()) {
            return Err(ConfigError::DuplicateTargetId(target.id.clone()));
        }
        if let Some(other) =
            file_names.insert(report_name(&target.id, ReportFormat::Json), &target.id)
        {
            return Err(ConfigError::InvalidTarget {
                id: target.id.clone(),
                reason: format!("report file name collides with target '{other}'"),
            });
        }
    }
    Ok(())
}

/// Rejects an empty check list and duplicate or blank names.
///
/// # Errors
///
/// Returns [`ConfigError::NoChecks`], [`ConfigError::DuplicateCheckName`] or
/// [`ConfigError::InvalidCheck`].
pub fn validate_checks(checks: &[CheckDefinition]) -> ConfigResult<()> {
    if checks.is_empty() {
        return Err(ConfigError::NoChecks);
    }
    let mut seen = HashSet::with_capacity(checks.len());
    for check in checks {
        if check.name().trim().is_empty() {
            return Err(ConfigError::InvalidCheck {
                name: check.name().to_string(),
                reason: "name must not be empty".to_string(),
            });
        }
        if check.command_template().trim().is_empty() {
            return Err(ConfigError::InvalidCheck {
                name: check.name().to_string(),
                reason: "command must not be empty".to_string(),
            });
        }
        if !seen.insert(check.name()) {
            return Err(ConfigError::DuplicateCheckName(check.name().to_string()));
        }
    }
    Ok(())
}

/// Runs every check against every target with bounded parallelism
#[derive(Debug, Clone)]
pub struct Orchestrator {
    runner: HostCheckRunner,
}

impl Orchestrator {
    /// Creates an orchestrator for a fixed set of checks.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the check list is empty or malformed.
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        checks: Vec<CheckDefinition>,
        limits: RunLimits,
    ) -> ConfigResult<Self> {
        validate_checks(&checks)?;
        let limits = RunLimits {
            concurrency: limits.concurrency.max(1),
            ..limits
        };
        Ok(Self {
            runner: HostCheckRunner::new(provider, checks.into(), limits),
        })
    }

    /// Limits in effect
    #[must_use]
    pub const fn limits(&self) -> &RunLimits {
        self.runner.limits()
    }

    /// Runs all targets to completion or until the run deadline.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an empty target list or duplicate ids;
    /// no runner starts in that case.
    pub async fn run(&self, targets: Vec<TargetDescriptor>) -> ConfigResult<FleetResult> {
        self.run_with_cancel(targets, &CancellationToken::new()).await
    }

    /// Runs all targets, stopping early if `cancel` fires.
    ///
    /// After cancellation no new targets are dispatched, in-flight runners
    /// are interrupted, and every target without a result is recorded as
    /// unreachable with a `cancelled` connection error.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an empty target list or duplicate ids.
    pub async fn run_with_cancel(
        &self,
        targets: Vec<TargetDescriptor>,
        cancel: &CancellationToken,
    ) -> ConfigResult<FleetResult> {
        validate_targets(&targets)?;

        let run_id = Uuid::new_v4();
        let span = trace_operation!(
            span_names::FLEET_RUN,
            run_id = %run_id,
            targets = targets.len(),
            concurrency = self.limits().concurrency,
        );

        Ok(self.execute(run_id, targets, cancel).instrument(span).await)
    }

    async fn execute(
        &self,
        run_id: Uuid,
        targets: Vec<TargetDescriptor>,
        cancel: &CancellationToken,
    ) -> FleetResult {
        let started_at = Utc::now();
        let deadline = Instant::now() + self.limits().run_deadline;
        let ids: Vec<String> = targets.iter().map(|t| t.id.clone()).collect();
        let workers = self.limits().concurrency.min(ids.len());

        tracing::info!(targets = ids.len(), workers, "Fleet run started");

        let stop = CancellationToken::new();
        let queue = Arc::new(Mutex::new(targets.into_iter()));
        let (tx, mut rx) = mpsc::channel::<HostResult>(workers);

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let runner = self.runner.clone();
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let stop = stop.clone();
            pool.spawn(
                async move {
                    loop {
                        if stop.is_cancelled() {
                            break;
                        }
                        let next = queue.lock().ok().and_then(|mut q| q.next());
                        let Some(target) = next else {
                            break;
                        };
                        let result = runner.run(&target, &stop).await;
                        if tx.send(result).await.is_err() {
                            break;
                        }
                    }
                }
                .in_current_span(),
            );
        }
        drop(tx);

        let mut host_results = BTreeMap::new();
        let mut deadline_exceeded = false;
        let mut cancelled = false;
        let run_deadline = tokio::time::sleep_until(deadline);
        tokio::pin!(run_deadline);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(result) => {
                        host_results.insert(result.target_id.clone(), result);
                    }
                    None => break,
                },
                () = cancel.cancelled(), if !stop.is_cancelled() => {
                    tracing::warn!(
                        completed = host_results.len(),
                        "Run cancelled, interrupting remaining targets"
                    );
                    cancelled = true;
                    stop.cancel_with(StopReason::Cancelled);
                }
                () = &mut run_deadline, if !stop.is_cancelled() => {
                    tracing::warn!(
                        completed = host_results.len(),
                        deadline_secs = self.limits().run_deadline.as_secs_f64(),
                        "Run deadline exceeded, interrupting remaining targets"
                    );
                    deadline_exceeded = true;
                    stop.cancel_with(StopReason::DeadlineExceeded);
                }
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task failed");
            }
        }

        let filled_at = Utc::now();
        for id in ids {
            host_results.entry(id.clone()).or_insert_with(|| {
                let error = if deadline_exceeded {
                    ConnectionError::new(
                        FailureKind::Timeout,
                        "Run deadline exceeded before the target was checked",
                    )
                } else if cancelled {
                    ConnectionError::new(
                        FailureKind::Cancelled,
                        "Run cancelled before the target was checked",
                    )
                } else {
                    ConnectionError::new(FailureKind::Other, "Runner aborted before reporting")
                };
                HostResult::unreachable(id, error, filled_at, filled_at)
            });
        }

        let result = FleetResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            deadline_exceeded,
            cancelled,
            host_results,
        };

        let summary = result.summary();
        tracing::info!(
            healthy = summary.healthy,
            warning = summary.warning,
            critical = summary.critical,
            unknown = summary.unknown,
            unreachable = summary.unreachable,
            deadline_exceeded,
            cancelled,
            "Fleet run finished"
        );

        result
    }
}
