//! Configuration loading: defaults, then file, then environment, then validation

use crate::channel::{validate_channel_name, Recipient};
use crate::models::{ConfigError, Configuration, LogLevel, Settings};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Prefix of every recognized environment variable
pub const ENV_PREFIX: &str = "SENTIFLOW_";

/// Builds [`Settings`] from layered configuration sources
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config: Configuration,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configuration(config: Configuration) -> Self {
        Self { config }
    }

    /// Default configuration file path: `<config_dir>/sentiflow/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sentiflow").join("config.toml"))
    }

    /// Layer a TOML or YAML file over the current configuration. Only keys
    /// present in the file are replaced, so layers may be applied in any order.
    /// A missing file leaves the configuration untouched.
    pub fn with_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Configuration file not found, using defaults");
            return Ok(self);
        }

        let unreadable = |reason: String| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let layer: Value = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| unreadable(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| unreadable(e.to_string()))?
        };

        let entries = match layer {
            Value::Null => return Ok(self),
            Value::Object(entries) => entries,
            other => return Err(unreadable(format!("expected a table, found {}", other))),
        };

        let mut merged = serde_json::to_value(&self.config).map_err(|e| unreadable(e.to_string()))?;
        if let Value::Object(base) = &mut merged {
            base.extend(entries);
        }
        self.config = serde_json::from_value(merged).map_err(|e| unreadable(e.to_string()))?;
        Ok(self)
    }

    /// Layer `SENTIFLOW_*` variables from the process environment
    pub fn with_process_env(self) -> Result<Self, ConfigError> {
        self.with_env(std::env::vars())
    }

    /// Layer `SENTIFLOW_*` variables from the given pairs. Unknown names are ignored.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(option) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = value.into();
            let c = &mut self.config;
            match option {
                "SYSTEM_NAME" => c.system_name = value,
                "ENV_TYPE" => c.env_type = value,
                "SOURCE_LOCATION_NAME" => c.source_location_name = Some(value),
                "DEST_LOCATION_NAME" => c.dest_location_name = Some(value),
                "AUDIT_LOG_LOCATION_NAME" => c.audit_log_location_name = Some(value),
                "NOTIFICATION_CHANNEL_NAME" => c.notification_channel_name = Some(value),
                "NOTIFICATION_RECIPIENTS" => c.notification_recipients = value,
                "DETECT_TASK_NAME" => c.detect_task_name = Some(value),
                "DELETE_TASK_NAME" => c.delete_task_name = Some(value),
                "RUN_DEADLINE_SECONDS" => {
                    c.run_deadline_seconds = parse_seconds("runDeadlineSeconds", &value)?
                }
                "DETECT_TIMEOUT_SECONDS" => {
                    c.detect_timeout_seconds = parse_seconds("detectTimeoutSeconds", &value)?
                }
                "DELETE_TIMEOUT_SECONDS" => {
                    c.delete_timeout_seconds = parse_seconds("deleteTimeoutSeconds", &value)?
                }
                "LOG_LEVEL" => {
                    c.log_level =
                        value
                            .parse::<LogLevel>()
                            .map_err(|_| ConfigError::InvalidValue {
                                setting: "logLevel",
                                value: value.clone(),
                            })?
                }
                "TASK_ENDPOINTS" => c.task_endpoints = parse_endpoint_list(&value)?,
                "NOTIFIER_WEBHOOK_URL" => c.notifier_webhook_url = Some(value),
                "ARCHIVE_PATH" => c.archive_path = Some(PathBuf::from(value)),
                _ => tracing::debug!(variable = key.as_ref(), "Ignoring unknown variable"),
            }
        }
        Ok(self)
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// Validate and resolve into read-only settings. Fails on the first invalid value.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        resolve(&self.config)
    }
}

/// Resolve a configuration into settings. Pure: equal input gives equal output.
pub fn resolve(config: &Configuration) -> Result<Settings, ConfigError> {
    let source_location = required(
        "sourceLocationName",
        config.name_or_service(&config.source_location_name, "input"),
    )?;
    let dest_location = required(
        "destLocationName",
        config.name_or_service(&config.dest_location_name, "output"),
    )?;
    let audit_log_location = required(
        "auditLogLocationName",
        config.name_or_service(&config.audit_log_location_name, "log"),
    )?;
    let notification_channel = required(
        "notificationChannelName",
        config.name_or_service(&config.notification_channel_name, "topic"),
    )?;
    let detect_task = required(
        "detectTaskName",
        config.name_or_service(&config.detect_task_name, "detect-sentiment"),
    )?;
    let delete_task = required(
        "deleteTaskName",
        config.name_or_service(&config.delete_task_name, "delete-object"),
    )?;

    validate_channel_name(&notification_channel).map_err(|e| {
        ConfigError::InvalidChannelName {
            name: notification_channel.clone(),
            reason: e.to_string(),
        }
    })?;

    let recipients = parse_recipients(&config.notification_recipients)?;

    let mut task_endpoints = BTreeMap::new();
    for (task, raw) in &config.task_endpoints {
        task_endpoints.insert(task.clone(), parse_url(task, raw)?);
    }

    let notifier_webhook = config
        .notifier_webhook_url
        .as_deref()
        .map(|raw| parse_url("notifierWebhookUrl", raw))
        .transpose()?;

    Ok(Settings {
        source_location,
        dest_location,
        audit_log_location,
        notification_channel,
        recipients,
        detect_task,
        delete_task,
        run_deadline: non_zero("runDeadlineSeconds", config.run_deadline_seconds)?,
        detect_timeout: non_zero("detectTimeoutSeconds", config.detect_timeout_seconds)?,
        delete_timeout: non_zero("deleteTimeoutSeconds", config.delete_timeout_seconds)?,
        log_level: config.log_level,
        task_endpoints,
        notifier_webhook,
        archive_path: config.archive_path.clone(),
    })
}

/// Split a comma-separated recipient list. Entries are not trimmed, and an
/// empty list is a single empty (invalid) entry.
pub fn parse_recipients(list: &str) -> Result<Vec<Recipient>, ConfigError> {
    list.split(',')
        .map(|entry| {
            Recipient::parse(entry).map_err(|e| ConfigError::InvalidRecipient(e.value().to_string()))
        })
        .collect()
}

fn required(setting: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingSetting(setting))
    } else {
        Ok(value)
    }
}

fn non_zero(setting: &'static str, seconds: u64) -> Result<Duration, ConfigError> {
    if seconds == 0 {
        return Err(ConfigError::InvalidValue {
            setting,
            value: seconds.to_string(),
        });
    }
    Ok(Duration::from_secs(seconds))
}

fn parse_seconds(setting: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        setting,
        value: value.to_string(),
    })
}

fn parse_url(target: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|_| ConfigError::InvalidEndpoint {
        target: target.to_string(),
        value: raw.to_string(),
    })
}

/// `name=url,name=url`
fn parse_endpoint_list(value: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut endpoints = BTreeMap::new();
    for entry in value.split(',').filter(|e| !e.trim().is_empty()) {
        let (task, url) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidValue {
                setting: "taskEndpoints",
                value: entry.to_string(),
            })?;
        endpoints.insert(task.trim().to_string(), url.trim().to_string());
    }
    Ok(endpoints)
}
