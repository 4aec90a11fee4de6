//! Notification delivery

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::Instrument;

use super::{IntentKind, NotificationIntent};
use crate::error::DeliveryError;
use crate::trace_operation;
use crate::tracing::span_names;

/// Delivers one notification intent
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends `intent` to all of its recipients.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the message cannot be built or sent.
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), DeliveryError>;
}

/// Sink that only writes intents to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), DeliveryError> {
        tracing::info!(
            kind = intent.kind.name(),
            recipients = %intent.recipients.join(", "),
            subject = %intent.subject,
            attachments = intent.attachments.len(),
            "Notification"
        );
        Ok(())
    }
}

/// What happened to one intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The sink accepted the intent
    Delivered,
    /// The intent had no recipients
    Skipped,
    /// The sink failed
    Failed(String),
}

/// Per-intent outcomes of [`deliver_all`], in intent order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Intent kind and its outcome
    pub outcomes: Vec<(IntentKind, DeliveryOutcome)>,
}

impl DeliveryReport {
    /// Number of delivered intents
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Delivered))
    }

    /// Number of intents skipped for lack of recipients
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Skipped))
    }

    /// Number of failed intents
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Failed(_)))
    }

    fn count<F: Fn(&DeliveryOutcome) -> bool>(&self, f: F) -> usize {
        self.outcomes.iter().filter(|(_, o)| f(o)).count()
    }
}

/// Delivers every intent, at most `concurrency` at a time.
///
/// A failed or skipped intent never stops the others.
pub async fn deliver_all(
    sink: &dyn NotificationSink,
    intents: &[NotificationIntent],
    concurrency: usize,
) -> DeliveryReport {
    let outcomes = stream::iter(intents)
        .map(|intent| {
            let span = trace_operation!(span_names::NOTIFY_DELIVER, kind = intent.kind.name());
            async move {
                if !intent.has_recipients() {
                    tracing::warn!(subject = %intent.subject, "No recipients configured, skipping");
                    return (intent.kind.clone(), DeliveryOutcome::Skipped);
                }
                match sink.deliver(intent).await {
                    Ok(()) => (intent.kind.clone(), DeliveryOutcome::Delivered),
                    Err(e) => {
                        tracing::error!(error = %e, subject = %intent.subject, "Delivery failed");
                        (intent.kind.clone(), DeliveryOutcome::Failed(e.to_string()))
                    }
                }
            }
            .instrument(span)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    DeliveryReport { outcomes }
}
