//! Trigger adapter: object-created events to workflow payloads

use crate::models::{ObjectCreatedEvent, Settings, WorkflowPayload};
use crate::services::logging::log_ignored_trigger;

/// Converts object-created events for the source location into run payloads
#[derive(Debug, Clone)]
pub struct TriggerAdapter {
    source_location: String,
    dest_location: String,
}

impl TriggerAdapter {
    pub fn new(source_location: impl Into<String>, dest_location: impl Into<String>) -> Self {
        Self {
            source_location: source_location.into(),
            dest_location: dest_location.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.source_location, &settings.dest_location)
    }

    /// Payload for a run, or `None` when the event is for another location.
    /// Each call produces a fresh correlation id.
    pub fn adapt(&self, event: &ObjectCreatedEvent) -> Option<WorkflowPayload> {
        if event.bucket_name != self.source_location {
            log_ignored_trigger(&event.bucket_name, &event.object_key, "not the source location");
            return None;
        }
        if event.object_key.is_empty() {
            log_ignored_trigger(&event.bucket_name, &event.object_key, "empty object key");
            return None;
        }
        Some(WorkflowPayload::new(
            &event.bucket_name,
            &event.object_key,
            &self.dest_location,
        ))
    }
}
