//! Task invoker trait

use crate::models::{TaskResult, WorkflowPayload};
use async_trait::async_trait;
use std::time::Duration;

/// Performs one remote task call
#[async_trait]
pub trait TaskInvoker: Send + Sync {
    /// Invoke a task by name
    ///
    /// # Arguments
    /// * `task_name` - Name of the remote task
    /// * `payload` - Payload handed to the task
    /// * `timeout` - Upper bound for the call
    ///
    /// # Returns
    /// The (possibly enriched) payload, or a typed failure. Exactly one call
    /// attempt is made; retrying is never the invoker's job.
    async fn invoke(&self, task_name: &str, payload: &WorkflowPayload, timeout: Duration)
        -> TaskResult;
}
