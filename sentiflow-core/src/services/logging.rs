//! Logging service

use crate::models::{LogLevel, RunStep};
use uuid::Uuid;

/// Initialize logging with the specified level.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "sentiflow_core={level},sentiflow={level}",
            level = level.as_str()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}

/// Log a run step change
pub fn log_transition(run_id: Uuid, from: RunStep, to: RunStep) {
    tracing::info!(
        run_id = %run_id,
        from = ?from,
        to = ?to,
        "Run transitioned"
    );
}

/// Log a trigger that did not start a run
pub fn log_ignored_trigger(bucket_name: &str, object_key: &str, reason: &str) {
    tracing::debug!(
        bucket = bucket_name,
        object_key = object_key,
        reason = reason,
        "Trigger ignored"
    );
}

/// Log a failed publish (never escalated)
pub fn log_notify_failure(run_id: Uuid, channel: &str, subject: &str, details: &str) {
    tracing::warn!(
        run_id = %run_id,
        channel = channel,
        subject = subject,
        details = details,
        "Notification delivery failed"
    );
}
