//! Ambient services: configuration loading and logging

pub mod config_loader;
pub mod logging;

pub use config_loader::ConfigLoader;
pub use logging::init_logging;
