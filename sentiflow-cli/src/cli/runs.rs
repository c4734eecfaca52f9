//! Run archive CLI commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum RunsCommands {
    /// List archived runs, oldest first
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show one run with its step history
    Status {
        /// Run ID (UUID)
        run_id: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List runs that exceeded their deadline without notifying
    Stalled {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
