//! Integration tests for WorkflowEngine

mod common;

use common::{definition, Behavior, RecordingNotifier, ScriptedInvoker, CHANNEL, DELETE, DETECT};
use sentiflow_core::models::{
    RunErrorKind, RunFailure, RunStep, TaskErrorKind, WorkflowPayload,
};
use sentiflow_core::workflow::{
    RunArchive, WorkflowEngine, ERROR_SUBJECT, SUCCESS_SUBJECT,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn payload() -> WorkflowPayload {
    WorkflowPayload {
        id: "X".to_string(),
        source_location: "in-bucket".to_string(),
        object_key: "doc1.txt".to_string(),
        dest_location: "out-bucket".to_string(),
        extra: Default::default(),
    }
}

fn engine(invoker: Arc<ScriptedInvoker>, notifier: Arc<RecordingNotifier>) -> WorkflowEngine {
    WorkflowEngine::new(definition(), invoker, notifier)
}

/// Detect and Delete both succeed: one success publish, run ends Done
#[tokio::test]
async fn test_happy_path_publishes_success_once() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let run = engine(invoker.clone(), notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert_eq!(run.current_step, RunStep::Done);
    assert!(run.failure.is_none());

    let calls = invoker.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, DETECT);
    assert_eq!(calls[0].1.id, "X");
    assert_eq!(calls[0].1.source_location, "in-bucket");
    assert_eq!(calls[0].1.object_key, "doc1.txt");
    assert_eq!(calls[0].1.dest_location, "out-bucket");
    assert_eq!(calls[1].0, DELETE);

    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].channel, CHANNEL);
    assert_eq!(published[0].subject, SUCCESS_SUBJECT);
    assert_eq!(published[0].body["objectKey"], "doc1.txt");
    assert!(published[0].body.get("error").is_none());
}

/// Steps are visited strictly in order
#[tokio::test]
async fn test_step_ordering() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let run = engine(invoker, notifier)
        .execute(Uuid::new_v4(), payload())
        .await;

    assert_eq!(
        run.visited_steps(),
        vec![
            RunStep::Detect,
            RunStep::Delete,
            RunStep::NotifySuccess,
            RunStep::Done
        ]
    );
    let timestamps: Vec<_> = run.transitions.iter().map(|t| t.timestamp).collect();
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
    assert!(run.completed_at.is_some());
}

/// Detect's output, including enrichment, is Delete's input
#[tokio::test]
async fn test_detect_output_feeds_delete() {
    let invoker = Arc::new(
        ScriptedInvoker::new().with(DETECT, Behavior::Enrich("sentiment", json!("POSITIVE"))),
    );
    let notifier = Arc::new(RecordingNotifier::new());

    let run = engine(invoker.clone(), notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    let calls = invoker.calls();
    assert_eq!(calls[1].1.extra["sentiment"], "POSITIVE");
    assert_eq!(notifier.published()[0].body["sentiment"], "POSITIVE");
    assert_eq!(
        run.output.unwrap().extra["sentiment"],
        json!("POSITIVE")
    );
}

/// Detect rejected: Delete never runs, one error publish, run ends Failed
#[tokio::test]
async fn test_detect_failure_skips_delete() {
    let invoker =
        Arc::new(ScriptedInvoker::new().with(DETECT, Behavior::Fail(TaskErrorKind::Rejected)));
    let notifier = Arc::new(RecordingNotifier::new());

    let run = engine(invoker.clone(), notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert_eq!(run.current_step, RunStep::Failed);
    assert_eq!(invoker.call_count(DETECT), 1);
    assert_eq!(invoker.call_count(DELETE), 0);

    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].channel, CHANNEL);
    assert_eq!(published[0].subject, ERROR_SUBJECT);
    assert_eq!(published[0].body["error"]["kind"], "Rejected");
    assert_eq!(published[0].body["error"]["step"], DETECT);
    assert_eq!(published[0].body["objectKey"], "doc1.txt");
    assert_eq!(published[0].body["id"], "X");
}

/// Delete fails after Detect succeeded: the error publish carries the
/// original payload plus the error
#[tokio::test]
async fn test_delete_failure_publishes_error() {
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .with(DETECT, Behavior::Enrich("sentiment", json!("NEGATIVE")))
            .with(DELETE, Behavior::Fail(TaskErrorKind::Unreachable)),
    );
    let notifier = Arc::new(RecordingNotifier::new());

    let run = engine(invoker.clone(), notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert_eq!(run.current_step, RunStep::Failed);
    assert_eq!(
        run.visited_steps(),
        vec![
            RunStep::Detect,
            RunStep::Delete,
            RunStep::NotifyError,
            RunStep::Failed
        ]
    );
    assert_eq!(invoker.call_count(DELETE), 1);

    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].subject, ERROR_SUBJECT);
    let body = &published[0].body;
    assert_eq!(body["error"]["kind"], "Unreachable");
    assert_eq!(body["error"]["step"], DELETE);
    assert_eq!(body["sourceLocation"], "in-bucket");
    assert_eq!(body["destLocation"], "out-bucket");
    // Built from the run input, not from Detect's output
    assert!(body.get("sentiment").is_none());

    match run.failure {
        Some(RunFailure::Task { step, error }) => {
            assert_eq!(step, DELETE);
            assert_eq!(error.kind, TaskErrorKind::Unreachable);
        }
        other => panic!("unexpected failure: {:?}", other),
    }
}

/// No retries: a failing task is called exactly once
#[tokio::test]
async fn test_failed_task_is_not_retried() {
    let invoker =
        Arc::new(ScriptedInvoker::new().with(DETECT, Behavior::Fail(TaskErrorKind::Unreachable)));
    let notifier = Arc::new(RecordingNotifier::new());

    engine(invoker.clone(), notifier)
        .execute(Uuid::new_v4(), payload())
        .await;

    assert_eq!(invoker.calls().len(), 1);
}

/// A rejected success publish is logged only; the run is still Done
#[tokio::test]
async fn test_success_notify_failure_keeps_done() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let notifier = Arc::new(RecordingNotifier::failing());

    let run = engine(invoker, notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert_eq!(run.current_step, RunStep::Done);
    assert!(run.failure.is_none());
    assert_eq!(notifier.published().len(), 1);
}

/// A rejected error publish still ends Failed, with no second publish
#[tokio::test]
async fn test_error_notify_failure_keeps_failed() {
    let invoker =
        Arc::new(ScriptedInvoker::new().with(DETECT, Behavior::Fail(TaskErrorKind::Rejected)));
    let notifier = Arc::new(RecordingNotifier::failing());

    let run = engine(invoker, notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert_eq!(run.current_step, RunStep::Failed);
    assert_eq!(notifier.published().len(), 1);
    assert_eq!(notifier.published()[0].subject, ERROR_SUBJECT);
}

/// A task slower than its own timeout fails with Timeout and takes the error branch
#[tokio::test]
async fn test_task_timeout_routes_to_error_branch() {
    let mut def = definition();
    def.detect_timeout = Duration::from_millis(50);
    let invoker =
        Arc::new(ScriptedInvoker::new().with(DETECT, Behavior::Hang(Duration::from_secs(5))));
    let notifier = Arc::new(RecordingNotifier::new());

    let run = WorkflowEngine::new(def, invoker.clone(), notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert_eq!(run.current_step, RunStep::Failed);
    assert_eq!(invoker.call_count(DELETE), 0);
    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].body["error"]["kind"], "Timeout");
}

/// The run deadline preempts everything: no publish, no further calls
#[tokio::test]
async fn test_deadline_exceeded_fails_silently() {
    let mut def = definition();
    def.run_deadline = Duration::from_millis(100);
    let invoker =
        Arc::new(ScriptedInvoker::new().with(DETECT, Behavior::Hang(Duration::from_secs(10))));
    let notifier = Arc::new(RecordingNotifier::new());

    let started = std::time::Instant::now();
    let run = WorkflowEngine::new(def, invoker.clone(), notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(run.current_step, RunStep::Failed);
    assert!(run.deadline_exceeded());
    assert!(matches!(
        run.failure,
        Some(RunFailure::Run {
            kind: RunErrorKind::DeadlineExceeded,
            ..
        })
    ));
    assert!(notifier.published().is_empty());
    assert_eq!(invoker.call_count(DELETE), 0);
    assert_eq!(
        run.visited_steps(),
        vec![RunStep::Detect, RunStep::Failed]
    );
}

/// Deadline hitting during Delete also abandons the run without notifying
#[tokio::test]
async fn test_deadline_exceeded_during_delete() {
    let mut def = definition();
    def.run_deadline = Duration::from_millis(100);
    let invoker =
        Arc::new(ScriptedInvoker::new().with(DELETE, Behavior::Hang(Duration::from_secs(10))));
    let notifier = Arc::new(RecordingNotifier::new());

    let run = WorkflowEngine::new(def, invoker.clone(), notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert!(run.deadline_exceeded());
    assert_eq!(invoker.call_count(DETECT), 1);
    assert_eq!(invoker.call_count(DELETE), 1);
    assert!(notifier.published().is_empty());
}

/// Runs are archived as they progress and on completion
#[tokio::test]
async fn test_runs_are_archived() {
    let archive = Arc::new(RunArchive::in_memory());
    let invoker = Arc::new(ScriptedInvoker::new());
    let notifier = Arc::new(RecordingNotifier::new());

    let run_id = Uuid::new_v4();
    let run = engine(invoker, notifier)
        .with_archive(archive.clone())
        .execute(run_id, payload())
        .await;

    let archived = archive.get(run_id).unwrap();
    assert_eq!(archived, run);
    assert!(archive.find_incomplete().is_empty());
    assert_eq!(archive.count_by_step(RunStep::Done), 1);
}

/// A publish still pending at the deadline is dropped and the run fails
#[tokio::test]
async fn test_deadline_exceeded_during_notify() {
    let mut def = definition();
    def.run_deadline = Duration::from_millis(100);
    let invoker = Arc::new(ScriptedInvoker::new());
    let notifier = Arc::new(RecordingNotifier::hanging(Duration::from_secs(10)));

    let started = std::time::Instant::now();
    let run = WorkflowEngine::new(def, invoker.clone(), notifier.clone())
        .execute(Uuid::new_v4(), payload())
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(run.current_step, RunStep::Failed);
    assert!(run.deadline_exceeded());
    assert_eq!(
        run.visited_steps(),
        vec![
            RunStep::Detect,
            RunStep::Delete,
            RunStep::NotifySuccess,
            RunStep::Failed
        ]
    );
    assert_eq!(notifier.published().len(), 1);
    assert_eq!(notifier.published()[0].subject, SUCCESS_SUBJECT);
}
