//! Notification providers
//!
//! A notifier publishes to a named channel whose recipient set is fixed when
//! the notifier is built. Publishing is best-effort: callers log failures and
//! move on.

mod log_sink;
mod notifier;
mod webhook;

pub use log_sink::LogNotifier;
pub use notifier::{message_id, ChannelRecipients, Notifier};
pub use webhook::WebhookNotifier;
