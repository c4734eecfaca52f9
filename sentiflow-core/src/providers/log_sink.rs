//! Notifier that writes publishes to the log

use crate::models::NotifyError;
use crate::providers::notifier::{message_id, ChannelRecipients, Notifier};
use async_trait::async_trait;
use serde_json::Value;

/// Logs each publish as a structured event. Used when no delivery endpoint is configured.
pub struct LogNotifier {
    recipients: ChannelRecipients,
}

impl LogNotifier {
    pub fn new(recipients: ChannelRecipients) -> Self {
        Self { recipients }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn publish(&self, channel: &str, subject: &str, body: &Value) -> Result<(), NotifyError> {
        let recipients = self
            .recipients
            .get(channel)
            .map(|r| {
                r.iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();

        tracing::info!(
            message_id = %message_id(channel, subject, body),
            channel = channel,
            recipients = %recipients,
            subject = subject,
            body = %body,
            "Notification published"
        );
        Ok(())
    }
}
