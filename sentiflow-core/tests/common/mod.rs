//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use sentiflow_core::models::{
    NotifyError, TaskError, TaskErrorKind, TaskResult, WorkflowPayload,
};
use sentiflow_core::providers::Notifier;
use sentiflow_core::workflow::{TaskInvoker, WorkflowDefinition};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const DETECT: &str = "detect-sentiment";
pub const DELETE: &str = "delete-object";
pub const CHANNEL: &str = "alerts";

pub fn definition() -> WorkflowDefinition {
    WorkflowDefinition {
        detect_task: DETECT.to_string(),
        delete_task: DELETE.to_string(),
        success_channel: CHANNEL.to_string(),
        error_channel: CHANNEL.to_string(),
        detect_timeout: Duration::from_secs(5),
        delete_timeout: Duration::from_secs(5),
        run_deadline: Duration::from_secs(30),
    }
}

/// What a scripted task does when invoked
#[derive(Clone)]
pub enum Behavior {
    /// Return the payload unchanged
    Echo,
    /// Return the payload with one extra field
    Enrich(&'static str, Value),
    /// Fail with the given kind
    Fail(TaskErrorKind),
    /// Sleep, then echo
    Hang(Duration),
}

/// Task invoker driven by per-task behaviors; records every call
#[derive(Default)]
pub struct ScriptedInvoker {
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<Vec<(String, WorkflowPayload)>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, task: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(task.to_string(), behavior);
        self
    }

    pub fn calls(&self) -> Vec<(String, WorkflowPayload)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, task: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == task)
            .count()
    }
}

#[async_trait]
impl TaskInvoker for ScriptedInvoker {
    async fn invoke(&self, task_name: &str, payload: &WorkflowPayload, _timeout: Duration) -> TaskResult {
        self.calls
            .lock()
            .unwrap()
            .push((task_name.to_string(), payload.clone()));

        match self.behaviors.get(task_name).cloned().unwrap_or(Behavior::Echo) {
            Behavior::Echo => Ok(payload.clone()),
            Behavior::Enrich(key, value) => {
                let mut enriched = payload.clone();
                enriched.extra.insert(key.to_string(), value);
                Ok(enriched)
            }
            Behavior::Fail(kind) => Err(TaskError::new(kind, format!("{} failed", task_name))),
            Behavior::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Ok(payload.clone())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Published {
    pub channel: String,
    pub subject: String,
    pub body: Value,
}

/// Notifier that records publishes, optionally rejecting or stalling every one
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    delay: Option<Duration>,
    published: Mutex<Vec<Published>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Record each publish, then sleep for `delay` before accepting it
    pub fn hanging(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, channel: &str, subject: &str, body: &Value) -> Result<(), NotifyError> {
        self.published.lock().unwrap().push(Published {
            channel: channel.to_string(),
            subject: subject.to_string(),
            body: body.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            Err(NotifyError::delivery_failed(channel, "sink rejected the publish"))
        } else {
            Ok(())
        }
    }
}
