//! Run the fleet and deliver notifications.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fleetcheck_core::notify::{FLEET_REPORT_STEM, LogSink, report_name};
use fleetcheck_core::session::SshOptions;
use fleetcheck_core::{
    CancellationToken, FleetConfig, FleetResult, HostHealth, NotificationIntent,
    NotificationPolicy, NotificationSink, Orchestrator, ReportFormat, RunLimits,
    SshSessionProvider, deliver_all, render_fleet, render_host,
};

use super::Context;
use super::smtp::SmtpSink;
use crate::error::CliError;
use crate::util::{Palette, load_config, select_targets};

/// Parameters for the run command
pub struct RunParams<'a> {
    pub tag: Option<&'a str>,
    pub output_dir: &'a Path,
    pub dry_run: bool,
}

/// Deliveries in flight at once
const DELIVERY_CONCURRENCY: usize = 4;

/// Subdirectory of the output directory holding per-host reports
const HOST_REPORT_DIR: &str = "hosts";

/// Report encodings written to disk
const REPORT_FORMATS: [ReportFormat; 2] = [ReportFormat::Json, ReportFormat::Html];

/// Run command handler
pub fn cmd_run(ctx: Context<'_>, params: &RunParams<'_>) -> Result<(), CliError> {
    let (_, config) = load_config(ctx.config_path)?;
    let FleetConfig {
        targets,
        checks,
        run,
        notify,
        smtp,
    } = config;
    let targets = select_targets(&targets, params.tag)?;

    let provider = SshSessionProvider::new(SshOptions {
        close_timeout: run.close_timeout(),
        ..SshOptions::default()
    });
    let orchestrator = Orchestrator::new(Arc::new(provider), checks, RunLimits::from(&run))?;
    let policy = NotificationPolicy::new(notify, &targets);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Config(format!("Failed to create async runtime: {e}")))?;

    let result = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; finishing with the results collected so far");
                trigger.cancel();
            }
        });
        let result = orchestrator.run_with_cancel(targets, &cancel).await;
        watcher.abort();
        result
    })?;

    let written = write_reports(params.output_dir, &result)?;
    tracing::info!(
        files = written.len(),
        dir = %params.output_dir.display(),
        "Reports written"
    );

    if !ctx.quiet {
        println!("{}", format_results(&result, ctx.palette));
    }

    let intents = policy.intents(&result);
    if params.dry_run {
        println!("{}", format_intents(&intents)?);
    } else {
        let sink: Box<dyn NotificationSink> = match &smtp {
            Some(settings) => Box::new(SmtpSink::new(settings)?),
            None => {
                tracing::warn!("No [smtp] table configured; notifications are only logged");
                Box::new(LogSink)
            }
        };
        let report = runtime.block_on(deliver_all(sink.as_ref(), &intents, DELIVERY_CONCURRENCY));
        tracing::info!(
            delivered = report.delivered(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Notifications processed"
        );
    }

    let summary = result.summary();
    if summary.is_degraded() {
        return Err(CliError::Degraded(summary.headline()));
    }
    Ok(())
}

/// Writes per-host reports under `hosts/` and combined reports at the top,
/// returning the written paths
pub fn write_reports(dir: &Path, result: &FleetResult) -> Result<Vec<PathBuf>, CliError> {
    let host_dir = dir.join(HOST_REPORT_DIR);
    std::fs::create_dir_all(&host_dir)?;
    let mut written = Vec::new();

    for (id, host) in &result.host_results {
        for format in REPORT_FORMATS {
            let path = host_dir.join(report_name(id, format));
            std::fs::write(&path, render_host(host, format)?)?;
            written.push(path);
        }
    }

    for format in REPORT_FORMATS {
        let path = dir.join(report_name(FLEET_REPORT_STEM, format));
        std::fs::write(&path, render_fleet(result, format)?)?;
        written.push(path);
    }

    Ok(written)
}

/// One line per host followed by the headline
#[must_use]
pub fn format_results(result: &FleetResult, palette: Palette) -> String {
    let mut lines: Vec<String> = result
        .host_results
        .values()
        .map(|host| {
            let health = host.health();
            let color = match health {
                HostHealth::Healthy => palette.green,
                HostHealth::Warning | HostHealth::Unknown => palette.yellow,
                HostHealth::Critical | HostHealth::Unreachable => palette.red,
            };
            let detail = host
                .connection_error
                .as_ref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default();
            format!(
                "{color}{:<11}{} {}{detail}",
                health.label(),
                palette.reset,
                host.target_id
            )
        })
        .collect();

    if result.deadline_exceeded {
        lines.push("Run deadline exceeded; unfinished hosts marked unreachable.".to_string());
    }
    if result.cancelled {
        lines.push("Run cancelled; unfinished hosts marked unreachable.".to_string());
    }
    lines.push(format!(
        "{}{}{}",
        palette.bold,
        result.summary().headline(),
        palette.reset
    ));
    lines.join("\n")
}

/// Intents as pretty JSON for `--dry-run`
pub fn format_intents(intents: &[NotificationIntent]) -> Result<String, CliError> {
    serde_json::to_string_pretty(intents)
        .map_err(|e| CliError::Report(format!("Failed to serialize notifications: {e}")))
}
