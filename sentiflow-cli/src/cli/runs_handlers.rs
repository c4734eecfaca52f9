//! Run archive command handlers

use super::handlers::{load_settings, print_run};
use anyhow::{anyhow, Context, Result};
use sentiflow_core::models::RunStep;
use sentiflow_core::workflow::RunArchive;

/// Open the archive named by `archivePath`
fn open_archive(config_path: Option<String>) -> Result<RunArchive> {
    let settings = load_settings(config_path)?;
    let path = settings.archive_path.ok_or_else(|| {
        anyhow!("No run archive configured. Set archivePath or SENTIFLOW_ARCHIVE_PATH.")
    })?;
    RunArchive::open(&path)
        .with_context(|| format!("Failed to open run archive at {}", path.display()))
}

/// Handle runs list command
pub async fn handle_runs_list(config_path: Option<String>, json: bool) -> Result<()> {
    let archive = open_archive(config_path)?;
    let runs = archive.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No runs archived.");
        return Ok(());
    }

    println!("Archived runs:");
    println!();
    for run in &runs {
        println!(
            "  {}  {:<13}  {}/{}  {}",
            run.run_id,
            format!("{:?}", run.current_step),
            run.payload.source_location,
            run.payload.object_key,
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!();
    println!(
        "Total: {} (done {}, failed {}, in progress {})",
        runs.len(),
        archive.count_by_step(RunStep::Done),
        archive.count_by_step(RunStep::Failed),
        archive.find_incomplete().len()
    );

    Ok(())
}

/// Handle runs status command
pub async fn handle_runs_status(
    config_path: Option<String>,
    run_id: String,
    json: bool,
) -> Result<()> {
    let run_uuid =
        uuid::Uuid::parse_str(&run_id).with_context(|| format!("Invalid run ID: {}", run_id))?;
    let archive = open_archive(config_path)?;

    let run = archive
        .get(run_uuid)
        .ok_or_else(|| anyhow!("Run not found: {}", run_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run(&run);
    }

    Ok(())
}

/// Handle runs stalled command
pub async fn handle_runs_stalled(config_path: Option<String>, json: bool) -> Result<()> {
    let archive = open_archive(config_path)?;
    let stalled = archive.find_stalled(chrono::Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&stalled)?);
        return Ok(());
    }

    if stalled.is_empty() {
        println!("No stalled runs.");
        return Ok(());
    }

    println!("⚠️  {} run(s) passed their deadline without finishing:", stalled.len());
    for run in &stalled {
        println!(
            "  {}  {:?}  {}/{}  deadline {}",
            run.run_id,
            run.current_step,
            run.payload.source_location,
            run.payload.object_key,
            run.deadline.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}
