//! SMTP delivery of notification intents.

use async_trait::async_trait;
use fleetcheck_core::{DeliveryError, NotificationIntent, NotificationSink, SmtpSettings};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::error::CliError;

/// Sends intents through an SMTP relay
pub struct SmtpSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSink {
    /// Builds the relay transport from settings
    pub fn new(settings: &SmtpSettings) -> Result<Self, CliError> {
        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server).map_err(
                |e| CliError::Notify(format!("Invalid SMTP relay '{}': {e}", settings.server)),
            )?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.server)
        };
        let mut builder = builder.port(settings.port);

        if let (Some(user), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                password.expose_secret().to_string(),
            ));
        }

        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|e| CliError::Notify(format!("Invalid sender '{}': {e}", settings.from)))?;

        tracing::debug!(
            server = %settings.server,
            port = settings.port,
            starttls = settings.starttls,
            "SMTP relay configured"
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl NotificationSink for SmtpSink {
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), DeliveryError> {
        let message = build_message(&self.from, intent)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Plain text with an optional HTML alternative, followed by attachments
pub fn build_message(from: &Mailbox, intent: &NotificationIntent) -> Result<Message, DeliveryError> {
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(intent.subject.clone());

    for recipient in intent.recipients.iter().filter(|r| !r.trim().is_empty()) {
        let mailbox = recipient.trim().parse::<Mailbox>().map_err(|e| {
            DeliveryError::InvalidMessage(format!("Invalid recipient '{recipient}': {e}"))
        })?;
        builder = builder.to(mailbox);
    }

    let content = match &intent.html {
        Some(html) => MultiPart::alternative_plain_html(intent.body.clone(), html.clone()),
        None => MultiPart::alternative().singlepart(SinglePart::plain(intent.body.clone())),
    };

    let mut mixed = MultiPart::mixed().multipart(content);
    for attachment in &intent.attachments {
        let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
            DeliveryError::InvalidMessage(format!(
                "Invalid content type for {}: {e}",
                attachment.filename
            ))
        })?;
        mixed = mixed.singlepart(
            Attachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), content_type),
        );
    }

    builder
        .multipart(mixed)
        .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcheck_core::IntentKind;
    use fleetcheck_core::notify::Attachment as ReportAttachment;

    fn intent() -> NotificationIntent {
        NotificationIntent {
            kind: IntentKind::FleetSummary,
            recipients: vec!["ops@example.com".into(), String::new()],
            subject: "[fleetcheck] Fleet health: 1 healthy".into(),
            body: "All good".into(),
            html: Some("<p>All good</p>".into()),
            attachments: vec![ReportAttachment::text(
                "combined_report.json",
                "application/json",
                "{}",
            )],
        }
    }

    #[test]
    fn test_build_message() {
        let from: Mailbox = "fleetcheck@example.com".parse().unwrap();
        let message = build_message(&from, &intent()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: ops@example.com"));
        assert!(raw.contains("Subject: [fleetcheck] Fleet health: 1 healthy"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("combined_report.json"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let from: Mailbox = "fleetcheck@example.com".parse().unwrap();
        let mut bad = intent();
        bad.recipients = vec!["not an address".into()];

        assert!(matches!(
            build_message(&from, &bad),
            Err(DeliveryError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_sink_rejects_bad_sender() {
        let settings = SmtpSettings {
            server: "smtp.example.com".into(),
            port: 587,
            username: None,
            password: None,
            from: "nobody".into(),
            starttls: true,
        };
        assert!(matches!(SmtpSink::new(&settings), Err(CliError::Notify(_))));
    }
}
