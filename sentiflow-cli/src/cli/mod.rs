//! CLI command handling

pub mod handlers;
pub mod runs;
pub mod runs_handlers;
