//! Decides which notifications a fleet run produces

use std::collections::BTreeMap;

use super::{Attachment, IntentKind, NotificationIntent};
use crate::config::NotifySettings;
use crate::models::{FleetResult, HostResult, TargetDescriptor};
use crate::report::{self, ReportFormat};

const SUBJECT_PREFIX: &str = "[fleetcheck]";

/// Stem of the combined fleet report files
pub const FLEET_REPORT_STEM: &str = "combined";

/// Attachment name of the attention digest report
pub const ATTENTION_REPORT_NAME: &str = "attention_summary.html";

/// Pure mapping from a [`FleetResult`] to notification intents
///
/// Always produces one [`IntentKind::HostAlert`] per unreachable host and
/// exactly one [`IntentKind::FleetSummary`]. Admin and attention digests are
/// added on top when enabled.
#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    settings: NotifySettings,
    contacts: BTreeMap<String, String>,
}

impl NotificationPolicy {
    /// Creates a policy for the given settings and the run's targets
    #[must_use]
    pub fn new(settings: NotifySettings, targets: &[TargetDescriptor]) -> Self {
        let contacts = targets
            .iter()
            .filter_map(|t| {
                t.admin_contact
                    .as_ref()
                    .filter(|c| !c.trim().is_empty())
                    .map(|c| (t.id.clone(), c.clone()))
            })
            .collect();
        Self { settings, contacts }
    }

    /// Settings in effect
    #[must_use]
    pub const fn settings(&self) -> &NotifySettings {
        &self.settings
    }

    /// Recipients of a per-host alert: the target's admin contact, then the
    /// fleet-wide admin contact, then the fleet-wide recipient list
    #[must_use]
    pub fn alert_recipients(&self, target_id: &str) -> Vec<String> {
        if let Some(contact) = self.contacts.get(target_id) {
            return vec![contact.clone()];
        }
        if let Some(contact) = self
            .settings
            .admin_contact
            .as_ref()
            .filter(|c| !c.trim().is_empty())
        {
            return vec![contact.clone()];
        }
        self.settings.recipients.clone()
    }

    /// Builds every intent for a completed run, in a stable order
    #[must_use]
    pub fn intents(&self, result: &FleetResult) -> Vec<NotificationIntent> {
        let mut intents: Vec<NotificationIntent> = result
            .unreachable_hosts()
            .map(|host| self.host_alert(host))
            .collect();

        intents.push(self.fleet_summary(result));

        if self.settings.admin_digests {
            intents.extend(self.admin_digests(result));
        }

        if let Some(digest) = self.attention_digest(result) {
            intents.push(digest);
        }

        tracing::debug!(intents = intents.len(), "Notification intents built");
        intents
    }

    fn host_alert(&self, host: &HostResult) -> NotificationIntent {
        let reason = host
            .connection_error
            .as_ref()
            .map_or_else(|| "unknown error".to_string(), ToString::to_string);

        let mut attachments = Vec::new();
        if let Ok(json) = report::render_host_json(host) {
            attachments.push(Attachment::text(
                report_name(&host.target_id, ReportFormat::Json),
                ReportFormat::Json.content_type(),
                json,
            ));
        }

        NotificationIntent {
            kind: IntentKind::HostAlert {
                target_id: host.target_id.clone(),
            },
            recipients: self.alert_recipients(&host.target_id),
            subject: format!("{SUBJECT_PREFIX} {} is unreachable", host.target_id),
            body: format!(
                "Could not connect to {} ({reason}).\n\n{}",
                host.target_id,
                report::render_host_text(host)
            ),
            html: Some(report::render_host_html(host)),
            attachments,
        }
    }

    fn fleet_summary(&self, result: &FleetResult) -> NotificationIntent {
        let summary = result.summary();
        let html = report::render_fleet_html(result);

        let mut attachments = Vec::new();
        if let Ok(json) = report::render_fleet_json(result) {
            attachments.push(Attachment::text(
                report_name(FLEET_REPORT_STEM, ReportFormat::Json),
                ReportFormat::Json.content_type(),
                json,
            ));
        }
        attachments.push(Attachment::text(
            report_name(FLEET_REPORT_STEM, ReportFormat::Html),
            ReportFormat::Html.content_type(),
            html.clone(),
        ));

        NotificationIntent {
            kind: IntentKind::FleetSummary,
            recipients: self.settings.recipients.clone(),
            subject: format!("{SUBJECT_PREFIX} Fleet health: {}", summary.headline()),
            body: report::render_fleet_text(result),
            html: Some(html),
            attachments,
        }
    }

    fn admin_digests(&self, result: &FleetResult) -> Vec<NotificationIntent> {
        let mut by_contact: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (target_id, contact) in &self.contacts {
            if result.host_results.contains_key(target_id) {
                by_contact
                    .entry(contact.as_str())
                    .or_default()
                    .push(target_id.as_str());
            }
        }

        by_contact
            .into_iter()
            .map(|(contact, ids)| {
                let subset = subset(result, |host| ids.contains(&host.target_id.as_str()));
                let attachments = subset
                    .host_results
                    .values()
                    .map(|host| {
                        Attachment::text(
                            report_name(&host.target_id, ReportFormat::Html),
                            ReportFormat::Html.content_type(),
                            report::render_host_html(host),
                        )
                    })
                    .collect();
                NotificationIntent {
                    kind: IntentKind::AdminDigest {
                        contact: contact.to_string(),
                    },
                    recipients: vec![contact.to_string()],
                    subject: format!(
                        "{SUBJECT_PREFIX} Your hosts: {}",
                        subset.summary().headline()
                    ),
                    body: report::render_fleet_text(&subset),
                    html: Some(report::render_fleet_html(&subset)),
                    attachments,
                }
            })
            .collect()
    }

    fn attention_digest(&self, result: &FleetResult) -> Option<NotificationIntent> {
        if self.settings.director_recipients.is_empty() {
            return None;
        }
        let subset = subset(result, |host| host.health().needs_attention());
        if subset.host_results.is_empty() {
            return None;
        }

        let subject = format!(
            "{SUBJECT_PREFIX} {} host(s) need attention",
            subset.host_results.len()
        );
        let html = report::render_fleet_attention_html(result);
        Some(NotificationIntent {
            kind: IntentKind::AttentionDigest,
            recipients: self.settings.director_recipients.clone(),
            subject,
            body: report::render_fleet_text(&subset),
            attachments: vec![Attachment::text(
                ATTENTION_REPORT_NAME,
                ReportFormat::Html.content_type(),
                html.clone(),
            )],
            html: Some(html),
        })
    }
}

/// Report file name for one host or the combined fleet
///
/// Characters outside `[A-Za-z0-9._-]` become `_`, so distinct ids can map
/// to the same name; target validation rejects such fleets.
#[must_use]
pub fn report_name(stem: &str, format: ReportFormat) -> String {
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}_report.{}", format.extension())
}

fn subset<F>(result: &FleetResult, keep: F) -> FleetResult
where
    F: Fn(&HostResult) -> bool,
{
    FleetResult {
        host_results: result
            .host_results
            .iter()
            .filter(|(_, host)| keep(host))
            .map(|(id, host)| (id.clone(), host.clone()))
            .collect(),
        ..result.clone()
    }
}
