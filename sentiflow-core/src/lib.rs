//! # Sentiflow Core Library
//!
//! Orchestration core for the document sentiment pipeline: a run detects the
//! sentiment of a newly created object, deletes the source object and reports
//! the outcome on a notification channel.

pub mod channel;
pub mod models;
pub mod parser;
pub mod providers;
pub mod services;
pub mod workflow;
