//! Run state data models

use crate::models::error::{RunErrorKind, TaskError};
use crate::models::payload::WorkflowPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Step a run is currently at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RunStep {
    Detect,
    Delete,
    NotifySuccess,
    NotifyError,
    /// Happy path finished
    Done,
    /// Error branch finished or deadline exceeded
    Failed,
}

impl RunStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStep::Done | RunStep::Failed)
    }
}

/// Why a run ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunFailure {
    /// A task failed and the error branch ran
    Task { step: String, error: TaskError },
    /// The run was preempted
    Run { kind: RunErrorKind, message: String },
}

/// Recorded step change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTransition {
    pub from: Option<RunStep>,
    pub to: RunStep,
    pub timestamp: DateTime<Utc>,
}

/// One workflow execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    /// Trigger payload the run started with
    pub payload: WorkflowPayload,
    pub current_step: RunStep,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Payload returned by the last task on the happy path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<WorkflowPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
    #[serde(default)]
    pub transitions: Vec<StepTransition>,
}

impl RunState {
    /// Create a run positioned at `Detect`
    pub fn new(run_id: Uuid, payload: WorkflowPayload, deadline: Duration) -> Self {
        let started_at = Utc::now();
        let deadline = chrono::Duration::from_std(deadline)
            .ok()
            .and_then(|d| started_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            run_id,
            payload,
            current_step: RunStep::Detect,
            started_at,
            deadline,
            completed_at: None,
            output: None,
            failure: None,
            transitions: vec![StepTransition {
                from: None,
                to: RunStep::Detect,
                timestamp: started_at,
            }],
        }
    }

    /// Move to `step`, recording the transition
    pub fn advance(&mut self, step: RunStep) {
        let now = Utc::now();
        self.transitions.push(StepTransition {
            from: Some(self.current_step),
            to: step,
            timestamp: now,
        });
        self.current_step = step;
        if step.is_terminal() {
            self.completed_at = Some(now);
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.current_step.is_terminal()
    }

    /// Steps visited, in order
    pub fn visited_steps(&self) -> Vec<RunStep> {
        self.transitions.iter().map(|t| t.to).collect()
    }

    /// True when the run was preempted by its deadline
    pub fn deadline_exceeded(&self) -> bool {
        matches!(
            self.failure,
            Some(RunFailure::Run {
                kind: RunErrorKind::DeadlineExceeded,
                ..
            })
        )
    }
}
