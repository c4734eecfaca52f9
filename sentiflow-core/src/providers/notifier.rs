//! Notifier: outbound delivery of run outcomes

use crate::channel::Recipient;
use crate::models::NotifyError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Channel name to its fixed recipient set
pub type ChannelRecipients = HashMap<String, Vec<Recipient>>;

/// Sink for publishing run notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Provider name for logging (e.g. "webhook").
    fn name(&self) -> &str;

    /// Publish `body` under `subject` to every recipient of `channel`.
    /// Re-sending the same (channel, subject, body) must be safe.
    async fn publish(&self, channel: &str, subject: &str, body: &Value) -> Result<(), NotifyError>;
}

/// Stable id for a publish, identical for identical (channel, subject, body)
pub fn message_id(channel: &str, subject: &str, body: &Value) -> Uuid {
    let key = format!("{}\n{}\n{}", channel, subject, body);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}
