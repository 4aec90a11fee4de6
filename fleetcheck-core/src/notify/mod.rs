//! Notification intents
//!
//! [`NotificationPolicy`] turns a finished [`FleetResult`](crate::models::FleetResult)
//! into [`NotificationIntent`]s without side effects. A [`NotificationSink`]
//! delivers them; [`deliver_all`] drives a sink over a batch of intents.

mod policy;
mod sink;

use serde::Serialize;

pub use policy::{ATTENTION_REPORT_NAME, FLEET_REPORT_STEM, NotificationPolicy, report_name};
pub use sink::{DeliveryOutcome, DeliveryReport, LogSink, NotificationSink, deliver_all};

/// What a notification is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentKind {
    /// One target could not be reached
    HostAlert {
        /// The unreachable target
        target_id: String,
    },
    /// Verdict counts across the whole fleet
    FleetSummary,
    /// Hosts owned by one admin contact
    AdminDigest {
        /// The admin contact the digest is for
        contact: String,
    },
    /// Only the hosts that need action
    AttentionDigest,
}

impl IntentKind {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::HostAlert { .. } => "host_alert",
            Self::FleetSummary => "fleet_summary",
            Self::AdminDigest { .. } => "admin_digest",
            Self::AttentionDigest => "attention_digest",
        }
    }
}

/// In-memory file attached to a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// File name shown to the recipient
    pub filename: String,
    /// MIME type
    pub content_type: String,
    /// File body
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from text
    #[must_use]
    pub fn text(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content: content.into().into_bytes(),
        }
    }
}

/// A message the policy wants sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationIntent {
    /// What the message is about
    #[serde(flatten)]
    pub kind: IntentKind,
    /// Addresses to deliver to; empty means nobody is configured
    pub recipients: Vec<String>,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
    /// Optional HTML alternative body
    #[serde(skip)]
    pub html: Option<String>,
    /// Attached reports
    pub attachments: Vec<Attachment>,
}

impl NotificationIntent {
    /// Whether the intent has anyone to deliver to
    #[must_use]
    pub fn has_recipients(&self) -> bool {
        self.recipients.iter().any(|r| !r.trim().is_empty())
    }
}
