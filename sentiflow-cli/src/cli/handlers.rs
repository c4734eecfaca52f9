//! Command handlers for config, run and replay

use anyhow::{anyhow, bail, Context, Result};
use sentiflow_core::models::{ObjectCreatedEvent, RunFailure, RunState, RunStep, Settings};
use sentiflow_core::parser::read_events;
use sentiflow_core::services::{init_logging, ConfigLoader};
use sentiflow_core::workflow::WorkflowOrchestrator;
use std::path::PathBuf;
use tokio::io::BufReader;

/// Load settings from the config file and environment, then start logging
/// at the configured level.
pub(crate) fn load_settings(config_path: Option<String>) -> Result<Settings> {
    let path = config_path
        .map(PathBuf::from)
        .or_else(ConfigLoader::default_config_path);

    let mut loader = ConfigLoader::new();
    if let Some(path) = &path {
        loader = loader
            .with_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    }
    let settings = loader
        .with_process_env()
        .context("Invalid SENTIFLOW_* environment variable")?
        .resolve()
        .context("Invalid configuration")?;

    init_logging(settings.log_level)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(settings)
}

/// Handle config command
pub async fn handle_config(config_path: Option<String>, json: bool) -> Result<()> {
    let settings = load_settings(config_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    println!("Configuration is valid");
    println!("   Source location: {}", settings.source_location);
    println!("   Destination location: {}", settings.dest_location);
    println!("   Audit log location: {}", settings.audit_log_location);
    println!("   Notification channel: {}", settings.notification_channel);
    let recipients: Vec<&str> = settings.recipients.iter().map(|r| r.as_str()).collect();
    println!("   Recipients: {}", recipients.join(", "));
    println!("   Detect task: {} ({}s)", settings.detect_task, settings.detect_timeout.as_secs());
    println!("   Delete task: {} ({}s)", settings.delete_task, settings.delete_timeout.as_secs());
    println!("   Run deadline: {}s", settings.run_deadline.as_secs());
    println!("   Log level: {}", settings.log_level.as_str());
    for (task, url) in &settings.task_endpoints {
        println!("   Endpoint {}: {}", task, url);
    }
    match &settings.notifier_webhook {
        Some(url) => println!("   Notifier: webhook {}", url),
        None => println!("   Notifier: log"),
    }
    if let Some(path) = &settings.archive_path {
        println!("   Run archive: {}", path.display());
    }

    Ok(())
}

/// Handle run command
pub async fn handle_run(
    config_path: Option<String>,
    bucket: String,
    key: String,
    json: bool,
) -> Result<()> {
    let settings = load_settings(config_path)?;
    let orchestrator = WorkflowOrchestrator::from_settings(&settings)?;

    let event = ObjectCreatedEvent::new(bucket.clone(), key.clone());
    let Some(run_id) = orchestrator.handle_event(&event) else {
        if json {
            let output = serde_json::json!({
                "bucketName": bucket,
                "objectKey": key,
                "status": "ignored",
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Trigger ignored: '{}' is not the source location '{}'",
                bucket, settings.source_location
            );
        }
        return Ok(());
    };

    let run = orchestrator
        .wait_for_completion(run_id)
        .await
        .context("Run did not complete")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run(&run);
    }

    if run.current_step == RunStep::Failed {
        bail!("Run {} failed", run.run_id);
    }
    Ok(())
}

/// Handle replay command
pub async fn handle_replay(
    config_path: Option<String>,
    input: Option<String>,
    json: bool,
) -> Result<()> {
    let settings = load_settings(config_path)?;
    let orchestrator = WorkflowOrchestrator::from_settings(&settings)?;

    let parsed = match &input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file: {}", path))?;
            read_events(BufReader::new(file)).await?
        }
        None => read_events(BufReader::new(tokio::io::stdin())).await?,
    };

    let mut ignored = 0;
    let mut run_ids = Vec::new();
    for event in &parsed.events {
        match orchestrator.handle_event(event) {
            Some(run_id) => run_ids.push(run_id),
            None => ignored += 1,
        }
    }

    let results = orchestrator.wait_for_runs(&run_ids).await;
    let mut runs = Vec::new();
    let mut lost = 0;
    for result in results {
        match result {
            Ok(run) => runs.push(run),
            Err(e) => {
                tracing::error!(error = %e, "Run task did not complete");
                lost += 1;
            }
        }
    }
    let done = runs.iter().filter(|r| r.current_step == RunStep::Done).count();
    let failed = runs.len() - done;

    if json {
        let output = serde_json::json!({
            "events": parsed.events.len(),
            "skipped": parsed.skipped,
            "invalid": parsed.invalid,
            "ignored": ignored,
            "done": done,
            "failed": failed,
            "lost": lost,
            "runs": runs,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Replayed {} event(s)", parsed.events.len());
        println!("   Skipped lines: {}", parsed.skipped);
        println!("   Invalid lines: {}", parsed.invalid);
        println!("   Ignored triggers: {}", ignored);
        println!("   Done: {}", done);
        println!("   Failed: {}", failed);
        if lost > 0 {
            println!("   Lost: {}", lost);
        }
    }

    Ok(())
}

/// Print one run with its step history
pub(crate) fn print_run(run: &RunState) {
    let icon = match run.current_step {
        RunStep::Done => "✅",
        RunStep::Failed => "❌",
        _ => "⏳",
    };
    println!("{} Run {}", icon, run.run_id);
    println!("   Object: {}/{}", run.payload.source_location, run.payload.object_key);
    println!("   Correlation ID: {}", run.payload.id);
    println!("   Step: {:?}", run.current_step);
    println!(
        "   Started: {}",
        run.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("   Deadline: {}", run.deadline.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(completed) = run.completed_at {
        let duration = completed.signed_duration_since(run.started_at);
        println!("   Duration: {}ms", duration.num_milliseconds());
    }

    match &run.failure {
        Some(RunFailure::Task { step, error }) => {
            println!("   Failed at {}: {:?} ({})", step, error.kind, error.message);
        }
        Some(RunFailure::Run { kind, message }) => {
            println!("   Aborted: {:?} ({})", kind, message);
        }
        None => {}
    }

    if !run.transitions.is_empty() {
        println!();
        println!("   History:");
        for transition in &run.transitions {
            let from = transition
                .from
                .map(|s| format!("{:?}", s))
                .unwrap_or_else(|| "start".to_string());
            println!(
                "     {} {} -> {:?}",
                transition.timestamp.format("%H:%M:%S%.3f"),
                from,
                transition.to
            );
        }
    }
}
