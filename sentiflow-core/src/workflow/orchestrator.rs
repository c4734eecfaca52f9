//! Run orchestration and lifecycle management

use crate::models::{ObjectCreatedEvent, RunState, Settings, WorkflowPayload};
use crate::providers::{ChannelRecipients, LogNotifier, Notifier, WebhookNotifier};
use crate::workflow::engine::{WorkflowDefinition, WorkflowEngine};
use crate::workflow::http_invoker::HttpTaskInvoker;
use crate::workflow::persistence::RunArchive;
use crate::workflow::trigger::TriggerAdapter;
use anyhow::{anyhow, Context, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Starts runs from triggers and tracks the ones in flight.
///
/// Runs share nothing mutable; each one is its own tokio task.
pub struct WorkflowOrchestrator {
    /// In-flight run handles
    active_runs: Arc<DashMap<Uuid, JoinHandle<RunState>>>,
    engine: Arc<WorkflowEngine>,
    trigger: TriggerAdapter,
}

impl WorkflowOrchestrator {
    pub fn new(engine: Arc<WorkflowEngine>, trigger: TriggerAdapter) -> Self {
        Self {
            active_runs: Arc::new(DashMap::new()),
            engine,
            trigger,
        }
    }

    /// Wire the HTTP invoker, the configured notifier and the archive from settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let invoker = Arc::new(HttpTaskInvoker::new(settings.task_endpoints.clone()));

        let mut recipients = ChannelRecipients::new();
        recipients.insert(
            settings.notification_channel.clone(),
            settings.recipients.clone(),
        );
        let notifier: Arc<dyn Notifier> = match &settings.notifier_webhook {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone(), recipients)),
            None => Arc::new(LogNotifier::new(recipients)),
        };

        // Finished runs are looked up in the archive once their handles are pruned
        let archive = match &settings.archive_path {
            Some(path) => RunArchive::open(path)
                .with_context(|| format!("Failed to open run archive at {}", path.display()))?,
            None => RunArchive::in_memory(),
        };
        let engine =
            WorkflowEngine::new(WorkflowDefinition::from_settings(settings), invoker, notifier)
                .with_archive(Arc::new(archive));

        Ok(Self::new(
            Arc::new(engine),
            TriggerAdapter::from_settings(settings),
        ))
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }

    /// Start a run for `event` if it targets the source location.
    /// Returns the run id, or `None` when the event was ignored.
    pub fn handle_event(&self, event: &ObjectCreatedEvent) -> Option<Uuid> {
        let payload = self.trigger.adapt(event)?;
        Some(self.start_run(payload))
    }

    /// Start a run for an already-built payload. Handles of runs that have
    /// already finished are released first.
    pub fn start_run(&self, payload: WorkflowPayload) -> Uuid {
        self.prune_finished();

        let run_id = Uuid::new_v4();
        let engine = self.engine.clone();

        let handle = tokio::spawn(async move { engine.execute(run_id, payload).await });
        self.active_runs.insert(run_id, handle);

        tracing::info!(run_id = %run_id, "Started run");
        run_id
    }

    /// Drop handles of finished runs. Their final state stays in the archive.
    fn prune_finished(&self) {
        self.active_runs.retain(|_, handle| !handle.is_finished());
    }

    /// Number of run handles currently held, finished or not
    pub fn tracked_count(&self) -> usize {
        self.active_runs.len()
    }

    /// Check if a run is still tracked as in flight
    pub fn is_running(&self, run_id: Uuid) -> bool {
        self.active_runs
            .get(&run_id)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.active_runs
            .iter()
            .filter(|entry| !entry.value().is_finished())
            .count()
    }

    /// Wait for a run to reach a terminal step
    pub async fn wait_for_completion(&self, run_id: Uuid) -> Result<RunState> {
        if let Some((_key, handle)) = self.active_runs.remove(&run_id) {
            return handle
                .await
                .map_err(|e| anyhow!("Run {} task failed: {}", run_id, e));
        }

        // Already collected; fall back to the archive
        self.engine
            .archive()
            .and_then(|archive| archive.get(run_id))
            .ok_or_else(|| anyhow!("Run {} not found", run_id))
    }

    /// Wait for the given runs, in order, and return their final states
    pub async fn wait_for_runs(&self, run_ids: &[Uuid]) -> Vec<Result<RunState>> {
        let waits = run_ids.iter().map(|id| self.wait_for_completion(*id));
        futures_util::future::join_all(waits).await
    }

    /// Wait for every tracked run and return their final states
    pub async fn drain(&self) -> Vec<Result<RunState>> {
        let run_ids: Vec<Uuid> = self.active_runs.iter().map(|e| *e.key()).collect();
        let waits = run_ids.into_iter().map(|id| self.wait_for_completion(id));
        futures_util::future::join_all(waits).await
    }
}
