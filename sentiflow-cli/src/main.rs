mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{handlers, runs_handlers};

#[derive(Parser)]
#[command(name = "sentiflow")]
#[command(version)]
#[command(about = "Sentiment pipeline orchestration: detect, delete, notify")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    /// Path to configuration file (TOML or YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and print the resolved configuration
    ///
    /// Sources, lowest to highest precedence: built-in defaults, the
    /// configuration file, SENTIFLOW_* environment variables.
    Config {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run the workflow for a single object-created trigger
    ///
    /// Triggers for any location other than the configured source location
    /// are ignored.
    ///
    /// Examples:
    ///   sentiflow run --bucket sentiflow-dev-input --key reviews/2024-01.txt
    ///   sentiflow run --bucket in-bucket --key doc1.txt --json
    Run {
        /// Location the object was created in
        #[arg(short, long)]
        bucket: String,

        /// Key of the created object
        #[arg(short, long)]
        key: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Replay a JSONL stream of trigger events, running matching ones concurrently
    ///
    /// Each line is either {"bucketName": ..., "objectKey": ...} or an
    /// audit-trail API call envelope; only object writes start runs.
    Replay {
        /// Input file path (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Inspect archived runs
    Runs {
        #[command(subcommand)]
        command: cli::runs::RunsCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { json } => {
            handlers::handle_config(cli.config, json).await?;
        }
        Commands::Run { bucket, key, json } => {
            handlers::handle_run(cli.config, bucket, key, json).await?;
        }
        Commands::Replay { input, json } => {
            handlers::handle_replay(cli.config, input, json).await?;
        }
        Commands::Runs { command } => {
            use cli::runs::RunsCommands;

            match command {
                RunsCommands::List { json } => {
                    runs_handlers::handle_runs_list(cli.config, json).await?;
                }
                RunsCommands::Status { run_id, json } => {
                    runs_handlers::handle_runs_status(cli.config, run_id, json).await?;
                }
                RunsCommands::Stalled { json } => {
                    runs_handlers::handle_runs_stalled(cli.config, json).await?;
                }
            }
        }
    }

    Ok(())
}
