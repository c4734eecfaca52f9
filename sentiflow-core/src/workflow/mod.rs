//! Run orchestration module

pub mod engine;
pub mod http_invoker;
pub mod invoker;
pub mod orchestrator;
pub mod persistence;
pub mod trigger;

pub use engine::*;
pub use http_invoker::*;
pub use invoker::*;
pub use orchestrator::*;
pub use persistence::*;
pub use trigger::*;
