//! Run execution engine
//!
//! A run is a single catch scope around two sequential task calls:
//!
//! ```text
//! Detect ──ok──▶ Delete ──ok──▶ NotifySuccess ──▶ Done
//!    │              │
//!    └────err───────┴──────────▶ NotifyError ───▶ Failed
//! ```
//!
//! The whole run is bounded by a deadline. When it elapses the in-flight call
//! is dropped, nothing else is invoked or published, and the run is `Failed`.

use crate::models::{
    ErrorInfo, RunErrorKind, RunFailure, RunState, RunStep, Settings, TaskError, WorkflowPayload,
};
use crate::providers::Notifier;
use crate::services::logging::{log_notify_failure, log_transition};
use crate::workflow::invoker::TaskInvoker;
use crate::workflow::persistence::RunArchive;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

pub const SUCCESS_SUBJECT: &str = "Success";
pub const ERROR_SUBJECT: &str = "Error";

/// Task names, channels and time bounds a run is driven with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDefinition {
    pub detect_task: String,
    pub delete_task: String,
    pub success_channel: String,
    pub error_channel: String,
    pub detect_timeout: Duration,
    pub delete_timeout: Duration,
    pub run_deadline: Duration,
}

impl WorkflowDefinition {
    /// Both outcomes go to the configured notification channel
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            detect_task: settings.detect_task.clone(),
            delete_task: settings.delete_task.clone(),
            success_channel: settings.notification_channel.clone(),
            error_channel: settings.notification_channel.clone(),
            detect_timeout: settings.detect_timeout,
            delete_timeout: settings.delete_timeout,
            run_deadline: settings.run_deadline,
        }
    }
}

/// Failure that ended the main branch
struct StepFailure {
    step: String,
    error: TaskError,
}

/// Drives runs from `Detect` to `Done` or `Failed`
pub struct WorkflowEngine {
    definition: WorkflowDefinition,
    invoker: Arc<dyn TaskInvoker>,
    notifier: Arc<dyn Notifier>,
    archive: Option<Arc<RunArchive>>,
}

impl WorkflowEngine {
    pub fn new(
        definition: WorkflowDefinition,
        invoker: Arc<dyn TaskInvoker>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            definition,
            invoker,
            notifier,
            archive: None,
        }
    }

    /// Record every run in `archive` as it progresses
    pub fn with_archive(mut self, archive: Arc<RunArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub fn archive(&self) -> Option<&Arc<RunArchive>> {
        self.archive.as_ref()
    }

    /// Execute one run to a terminal step and return its final state
    pub async fn execute(&self, run_id: Uuid, payload: WorkflowPayload) -> RunState {
        let deadline = Instant::now() + self.definition.run_deadline;
        let mut run = RunState::new(run_id, payload, self.definition.run_deadline);
        self.archive_run(&run).await;

        tracing::info!(
            run_id = %run_id,
            object_key = %run.payload.object_key,
            "Starting run"
        );

        let timed = tokio::time::timeout_at(deadline, self.drive(&mut run, deadline)).await;
        let outcome = match timed {
            Ok(outcome) => outcome,
            // Deadline hit while archiving the final step
            Err(_) if run.is_terminal() => Ok(()),
            Err(_) => Err(RunErrorKind::DeadlineExceeded),
        };

        if let Err(kind) = outcome {
            tracing::error!(
                run_id = %run_id,
                step = ?run.current_step,
                kind = ?kind,
                "Run abandoned"
            );
            run.failure = Some(RunFailure::Run {
                kind,
                message: format!(
                    "run did not finish within {:?}; abandoned at {:?}",
                    self.definition.run_deadline, run.current_step
                ),
            });
            self.transition(&mut run, RunStep::Failed).await;
        }

        tracing::info!(
            run_id = %run_id,
            step = ?run.current_step,
            "Run finished"
        );
        run
    }

    async fn drive(&self, run: &mut RunState, deadline: Instant) -> Result<(), RunErrorKind> {
        let input = run.payload.clone();

        match self.main_branch(run, &input, deadline).await? {
            Ok(output) => {
                check_deadline(deadline)?;
                self.notify_success(run, output).await;
            }
            Err(failure) => {
                check_deadline(deadline)?;
                self.notify_error(run, &input, failure).await;
            }
        }
        Ok(())
    }

    /// Detect then Delete. The first task failure ends the branch.
    async fn main_branch(
        &self,
        run: &mut RunState,
        input: &WorkflowPayload,
        deadline: Instant,
    ) -> Result<Result<WorkflowPayload, StepFailure>, RunErrorKind> {
        let detected = match self
            .invoke_step(
                run.run_id,
                &self.definition.detect_task,
                input,
                self.definition.detect_timeout,
                deadline,
            )
            .await?
        {
            Ok(payload) => payload,
            Err(failure) => return Ok(Err(failure)),
        };

        self.transition(run, RunStep::Delete).await;

        self.invoke_step(
            run.run_id,
            &self.definition.delete_task,
            &detected,
            self.definition.delete_timeout,
            deadline,
        )
        .await
    }

    /// One task call, bounded by the task timeout or the time left in the run,
    /// whichever is sooner. Only the task timeout produces `Timeout`; the run
    /// deadline is reported as `DeadlineExceeded`.
    async fn invoke_step(
        &self,
        run_id: Uuid,
        task: &str,
        payload: &WorkflowPayload,
        task_timeout: Duration,
        deadline: Instant,
    ) -> Result<Result<WorkflowPayload, StepFailure>, RunErrorKind> {
        check_deadline(deadline)?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let bound = task_timeout.min(remaining);

        let call = self.invoker.invoke(task, payload, bound);
        let result = if task_timeout < remaining {
            match tokio::time::timeout(task_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(TaskError::timeout(format!(
                    "task '{}' did not answer within {:?}",
                    task, task_timeout
                ))),
            }
        } else {
            call.await
        };

        match result {
            Ok(output) => {
                tracing::debug!(run_id = %run_id, task = task, "Task succeeded");
                Ok(Ok(output))
            }
            Err(error) => {
                check_deadline(deadline)?;
                tracing::warn!(
                    run_id = %run_id,
                    task = task,
                    kind = ?error.kind,
                    message = %error.message,
                    "Task failed"
                );
                Ok(Err(StepFailure {
                    step: task.to_string(),
                    error,
                }))
            }
        }
    }

    /// Publish the success notification. The run ends `Done` whatever the outcome.
    async fn notify_success(&self, run: &mut RunState, output: WorkflowPayload) {
        self.transition(run, RunStep::NotifySuccess).await;

        let body = output.to_body();
        run.output = Some(output);
        self.publish(run.run_id, &self.definition.success_channel, SUCCESS_SUBJECT, &body)
            .await;

        self.transition(run, RunStep::Done).await;
    }

    /// The single error branch: publish the input payload with `error`
    /// appended, then end `Failed`.
    async fn notify_error(&self, run: &mut RunState, input: &WorkflowPayload, failure: StepFailure) {
        let info = ErrorInfo::from_task_error(&failure.step, &failure.error);
        run.failure = Some(RunFailure::Task {
            step: failure.step,
            error: failure.error,
        });
        self.transition(run, RunStep::NotifyError).await;

        let body = input.with_error(&info);
        self.publish(run.run_id, &self.definition.error_channel, ERROR_SUBJECT, &body)
            .await;

        self.transition(run, RunStep::Failed).await;
    }

    /// Best-effort publish: failures are logged, never propagated
    async fn publish(&self, run_id: Uuid, channel: &str, subject: &str, body: &Value) {
        match self.notifier.publish(channel, subject, body).await {
            Ok(()) => tracing::debug!(
                run_id = %run_id,
                channel = channel,
                subject = subject,
                notifier = self.notifier.name(),
                "Notification published"
            ),
            Err(e) => log_notify_failure(run_id, channel, subject, &e.to_string()),
        }
    }

    async fn transition(&self, run: &mut RunState, to: RunStep) {
        let from = run.current_step;
        run.advance(to);
        log_transition(run.run_id, from, to);
        self.archive_run(run).await;
    }

    /// Record the run on the blocking pool; archive writes do file I/O
    async fn archive_run(&self, run: &RunState) {
        let Some(archive) = self.archive.clone() else {
            return;
        };
        let run_id = run.run_id;
        let snapshot = run.clone();
        match tokio::task::spawn_blocking(move || archive.record(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(run_id = %run_id, error = %e, "Failed to archive run"),
            Err(e) => tracing::warn!(run_id = %run_id, error = %e, "Archive task failed"),
        }
    }
}

fn check_deadline(deadline: Instant) -> Result<(), RunErrorKind> {
    if Instant::now() >= deadline {
        Err(RunErrorKind::DeadlineExceeded)
    } else {
        Ok(())
    }
}
