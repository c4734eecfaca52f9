//! Configuration data structures

use crate::channel::Recipient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

pub const DEFAULT_SYSTEM_NAME: &str = "sentiflow";
pub const DEFAULT_ENV_TYPE: &str = "dev";
/// Overall run deadline (30 minutes)
pub const DEFAULT_RUN_DEADLINE_SECS: u64 = 1800;
pub const DEFAULT_DETECT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_DELETE_TIMEOUT_SECS: u64 = 3;

/// Raw configuration as read from file and environment.
///
/// Resource names left unset are derived from `systemName` and `envType`
/// when the configuration is resolved into [`Settings`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub system_name: String,
    pub env_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log_location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_channel_name: Option<String>,
    /// Comma-separated recipient addresses
    pub notification_recipients: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detect_task_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_task_name: Option<String>,
    pub run_deadline_seconds: u64,
    pub detect_timeout_seconds: u64,
    pub delete_timeout_seconds: u64,
    pub log_level: LogLevel,
    /// Task name to endpoint URL
    pub task_endpoints: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifier_webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            system_name: DEFAULT_SYSTEM_NAME.to_string(),
            env_type: DEFAULT_ENV_TYPE.to_string(),
            source_location_name: None,
            dest_location_name: None,
            audit_log_location_name: None,
            notification_channel_name: None,
            notification_recipients: String::new(),
            detect_task_name: None,
            delete_task_name: None,
            run_deadline_seconds: DEFAULT_RUN_DEADLINE_SECS,
            detect_timeout_seconds: DEFAULT_DETECT_TIMEOUT_SECS,
            delete_timeout_seconds: DEFAULT_DELETE_TIMEOUT_SECS,
            log_level: LogLevel::Info,
            task_endpoints: BTreeMap::new(),
            notifier_webhook_url: None,
            archive_path: None,
        }
    }
}

impl Configuration {
    /// Derived resource name: `<systemName>-<envType>-<suffix>`
    pub fn service_name(&self, suffix: &str) -> String {
        format!("{}-{}-{}", self.system_name, self.env_type, suffix)
    }

    /// Explicit name if set, otherwise the derived one
    pub fn name_or_service(&self, explicit: &Option<String>, suffix: &str) -> String {
        explicit
            .clone()
            .unwrap_or_else(|| self.service_name(suffix))
    }
}

/// Validated, read-only settings the runtime is built from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub source_location: String,
    pub dest_location: String,
    pub audit_log_location: String,
    pub notification_channel: String,
    pub recipients: Vec<Recipient>,
    pub detect_task: String,
    pub delete_task: String,
    pub run_deadline: Duration,
    pub detect_timeout: Duration,
    pub delete_timeout: Duration,
    pub log_level: LogLevel,
    pub task_endpoints: BTreeMap<String, Url>,
    pub notifier_webhook: Option<Url>,
    pub archive_path: Option<PathBuf>,
}
