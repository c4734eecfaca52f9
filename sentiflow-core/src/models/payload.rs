//! Workflow payload carried through a run

use crate::models::error::{TaskError, TaskErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

const ERROR_FIELD: &str = "error";
const INPUT_ERROR_FIELD: &str = "inputError";

/// Result of a single task invocation
pub type TaskResult = Result<WorkflowPayload, TaskError>;

/// Payload handed from the trigger to each task in turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPayload {
    /// Opaque correlation id
    pub id: String,
    /// Location the object was created in
    pub source_location: String,
    /// Key of the created object
    pub object_key: String,
    /// Location results are written to
    pub dest_location: String,
    /// Fields a task added to the payload; carried on unchanged
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl WorkflowPayload {
    /// Build a payload for a freshly created object with a new correlation id
    pub fn new(
        source_location: impl Into<String>,
        object_key: impl Into<String>,
        dest_location: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_location: source_location.into(),
            object_key: object_key.into(),
            dest_location: dest_location.into(),
            extra: Map::new(),
        }
    }

    /// JSON body used for notifications
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("id".to_string(), Value::String(self.id.clone()));
        body.insert(
            "sourceLocation".to_string(),
            Value::String(self.source_location.clone()),
        );
        body.insert(
            "objectKey".to_string(),
            Value::String(self.object_key.clone()),
        );
        body.insert(
            "destLocation".to_string(),
            Value::String(self.dest_location.clone()),
        );
        for (key, value) in &self.extra {
            body.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(body)
    }

    /// Body for the error notification: every payload field plus `error`.
    /// An `error` field already in the payload is kept as `inputError`.
    pub fn with_error(&self, error: &ErrorInfo) -> Value {
        let mut body = self.to_body();
        if let Value::Object(map) = &mut body {
            if let Some(existing) = map.remove(ERROR_FIELD) {
                map.insert(INPUT_ERROR_FIELD.to_string(), existing);
            }
            map.insert(ERROR_FIELD.to_string(), error.to_value());
        }
        body
    }
}

/// Failure description appended to the payload on the error branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: TaskErrorKind,
    pub message: String,
    /// Task that failed
    pub step: String,
}

impl ErrorInfo {
    pub fn from_task_error(step: impl Into<String>, error: &TaskError) -> Self {
        Self {
            kind: error.kind,
            message: error.message.clone(),
            step: step.into(),
        }
    }

    fn to_value(&self) -> Value {
        serde_json::json!({
            "kind": self.kind,
            "message": self.message,
            "step": self.step,
        })
    }
}
