//! Inbound trigger events

use serde::{Deserialize, Serialize};

/// Object-created notification: the only trigger shape the workflow accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCreatedEvent {
    pub bucket_name: String,
    pub object_key: String,
}

impl ObjectCreatedEvent {
    pub fn new(bucket_name: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            object_key: object_key.into(),
        }
    }
}

/// Audit-trail API call envelope as delivered by the event bus
#[derive(Debug, Clone, Deserialize)]
pub struct AuditEventEnvelope {
    pub source: String,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    pub detail: AuditEventDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEventDetail {
    pub event_source: String,
    pub event_name: String,
    #[serde(default)]
    pub request_parameters: Option<AuditRequestParameters>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRequestParameters {
    pub bucket_name: String,
    pub key: String,
}

pub const AUDIT_EVENT_SOURCE: &str = "aws.s3";
pub const AUDIT_DETAIL_TYPE: &str = "AWS API Call via CloudTrail";
pub const AUDIT_STORAGE_SERVICE: &str = "s3.amazonaws.com";
pub const AUDIT_OBJECT_CREATED: &str = "PutObject";

impl AuditEventEnvelope {
    /// The object-created event this envelope describes, if it is a
    /// write of a new object
    pub fn object_created(&self) -> Option<ObjectCreatedEvent> {
        if self.source != AUDIT_EVENT_SOURCE
            || self.detail_type != AUDIT_DETAIL_TYPE
            || self.detail.event_source != AUDIT_STORAGE_SERVICE
            || self.detail.event_name != AUDIT_OBJECT_CREATED
        {
            return None;
        }
        let params = self.detail.request_parameters.as_ref()?;
        Some(ObjectCreatedEvent::new(&params.bucket_name, &params.key))
    }
}
