//! Webhook notifier: deliver publishes as JSON POSTs to an HTTP endpoint.

use crate::models::NotifyError;
use crate::providers::notifier::{message_id, ChannelRecipients, Notifier};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const PUBLISH_TIMEOUT_SECS: u64 = 10;

/// Request body sent for every publish
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest<'a> {
    /// Same for identical publishes so the receiver can drop duplicates
    pub message_id: String,
    pub channel: &'a str,
    pub recipients: Vec<&'a str>,
    pub subject: &'a str,
    pub message: &'a Value,
}

/// Notifier posting to a webhook. Recipients are fixed per channel at construction.
pub struct WebhookNotifier {
    endpoint: Url,
    recipients: ChannelRecipients,
    client: Arc<Client>,
}

impl WebhookNotifier {
    pub fn new(endpoint: Url, recipients: ChannelRecipients) -> Self {
        Self {
            endpoint,
            recipients,
            client: Arc::new(Client::new()),
        }
    }

    fn build_request<'a>(
        &'a self,
        channel: &'a str,
        subject: &'a str,
        body: &'a Value,
    ) -> PublishRequest<'a> {
        let recipients = self
            .recipients
            .get(channel)
            .map(|r| r.iter().map(|r| r.as_str()).collect())
            .unwrap_or_default();

        PublishRequest {
            message_id: message_id(channel, subject, body).to_string(),
            channel,
            recipients,
            subject,
            message: body,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn publish(&self, channel: &str, subject: &str, body: &Value) -> Result<(), NotifyError> {
        let request = self.build_request(channel, subject, body);
        let res = self
            .client
            .post(self.endpoint.clone())
            .timeout(Duration::from_secs(PUBLISH_TIMEOUT_SECS))
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::delivery_failed(channel, e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let err_body = res.text().await.unwrap_or_default();
            return Err(NotifyError::delivery_failed(
                channel,
                format!("webhook returned {}: {}", status, err_body),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Recipient;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_webhook_notifier_name() {
        let notifier = WebhookNotifier::new(
            Url::parse("http://localhost:9000/notify").unwrap(),
            HashMap::new(),
        );
        assert_eq!(notifier.name(), "webhook");
    }

    #[test]
    fn test_request_carries_channel_recipients() {
        let mut recipients = HashMap::new();
        recipients.insert(
            "alerts".to_string(),
            vec![
                Recipient::parse("ops@example.com").unwrap(),
                Recipient::parse("dev@example.com").unwrap(),
            ],
        );
        let notifier = WebhookNotifier::new(
            Url::parse("http://localhost:9000/notify").unwrap(),
            recipients,
        );
        let body = json!({"objectKey": "doc1.txt"});

        let request = notifier.build_request("alerts", "Success", &body);
        assert_eq!(request.recipients, vec!["ops@example.com", "dev@example.com"]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["subject"], "Success");
        assert_eq!(json["message"]["objectKey"], "doc1.txt");
        assert!(json["messageId"].is_string());

        let unknown = notifier.build_request("other", "Success", &body);
        assert!(unknown.recipients.is_empty());
    }
}
