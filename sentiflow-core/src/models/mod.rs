//! Data models for sentiflow

pub mod configuration;
pub mod error;
pub mod event;
pub mod payload;
pub mod run;

pub use configuration::*;
pub use error::*;
pub use event::*;
pub use payload::*;
pub use run::*;
