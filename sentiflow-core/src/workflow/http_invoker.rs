//! HTTP task invoker: one JSON POST per task call

use crate::models::{TaskError, TaskErrorKind, TaskResult, WorkflowPayload};
use crate::workflow::invoker::TaskInvoker;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Error descriptor a task may return instead of a payload
#[derive(Debug, Deserialize)]
struct ErrorDescriptor {
    #[serde(default)]
    kind: Option<String>,
    message: String,
}

/// Invokes tasks by POSTing the payload to a per-task URL
pub struct HttpTaskInvoker {
    endpoints: BTreeMap<String, Url>,
    client: Arc<Client>,
}

impl HttpTaskInvoker {
    pub fn new(endpoints: BTreeMap<String, Url>) -> Self {
        Self {
            endpoints,
            client: Arc::new(Client::new()),
        }
    }

    /// Decode a successful response body. Function-style responses wrap the
    /// payload as `{"Payload": {...}}`; both shapes are accepted.
    fn decode_success(body: &str) -> TaskResult {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| TaskError::rejected(format!("response is not JSON: {}", e)))?;

        if let Ok(descriptor) = serde_json::from_value::<ErrorDescriptor>(value.clone()) {
            if value.get("id").is_none() {
                return Err(TaskError::rejected(describe(&descriptor)));
            }
        }

        let inner = match value {
            Value::Object(mut map) if map.contains_key("Payload") => {
                map.remove("Payload").unwrap_or(Value::Null)
            }
            other => other,
        };

        serde_json::from_value(inner)
            .map_err(|e| TaskError::rejected(format!("response is not a workflow payload: {}", e)))
    }

    /// Decode a non-2xx response into a `Rejected` failure
    fn decode_failure(status: reqwest::StatusCode, body: &str) -> TaskError {
        match serde_json::from_str::<ErrorDescriptor>(body) {
            Ok(descriptor) => TaskError::rejected(describe(&descriptor)),
            Err(_) if body.is_empty() => TaskError::rejected(format!("task returned {}", status)),
            Err(_) => TaskError::rejected(format!("task returned {}: {}", status, body)),
        }
    }

    fn classify(err: reqwest::Error) -> TaskError {
        if err.is_timeout() {
            TaskError::new(TaskErrorKind::Timeout, err.to_string())
        } else {
            TaskError::new(TaskErrorKind::Unreachable, err.to_string())
        }
    }
}

fn describe(descriptor: &ErrorDescriptor) -> String {
    match &descriptor.kind {
        Some(kind) => format!("{}: {}", kind, descriptor.message),
        None => descriptor.message.clone(),
    }
}

#[async_trait]
impl TaskInvoker for HttpTaskInvoker {
    async fn invoke(
        &self,
        task_name: &str,
        payload: &WorkflowPayload,
        timeout: Duration,
    ) -> TaskResult {
        let endpoint = self.endpoints.get(task_name).ok_or_else(|| {
            TaskError::unreachable(format!("no endpoint configured for task '{}'", task_name))
        })?;

        tracing::debug!(task = task_name, endpoint = %endpoint, "Invoking task");

        let res = self
            .client
            .post(endpoint.clone())
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = res.status();
        let body = res.text().await.map_err(Self::classify)?;

        if status.is_success() {
            Self::decode_success(&body)
        } else {
            Err(Self::decode_failure(status, &body))
        }
    }
}
