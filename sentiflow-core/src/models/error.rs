//! Error taxonomy shared by the invoker, notifier, config loader and engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a task invocation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskErrorKind {
    /// The remote endpoint could not be reached
    Unreachable,
    /// The call completed but the task signalled a business failure
    Rejected,
    /// The caller-supplied bound elapsed before the task answered
    Timeout,
}

/// Failure returned by a task invocation
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("task {kind:?}: {message}")]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Unreachable, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Rejected, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Timeout, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyErrorKind {
    DeliveryFailed,
}

/// Failure returned by a notification sink
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification {kind:?} on channel '{channel}': {message}")]
pub struct NotifyError {
    pub kind: NotifyErrorKind,
    pub channel: String,
    pub message: String,
}

impl NotifyError {
    pub fn delivery_failed(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotifyErrorKind::DeliveryFailed,
            channel: channel.into(),
            message: message.into(),
        }
    }
}

/// Category of a configuration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigErrorKind {
    InvalidRecipient,
    InvalidChannelName,
    MissingSetting,
    InvalidEndpoint,
    InvalidValue,
    Unreadable,
}

/// Errors raised while loading or resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Notification recipient is invalid: '{0}'")]
    InvalidRecipient(String),

    #[error("Notification channel name is invalid: '{name}' ({reason})")]
    InvalidChannelName { name: String, reason: String },

    #[error("Required setting '{0}' is empty")]
    MissingSetting(&'static str),

    #[error("Endpoint for '{target}' is not a valid URL: '{value}'")]
    InvalidEndpoint { target: String, value: String },

    #[error("Setting '{setting}' has an invalid value: '{value}'")]
    InvalidValue { setting: &'static str, value: String },

    #[error("Configuration could not be read from {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::InvalidRecipient(_) => ConfigErrorKind::InvalidRecipient,
            ConfigError::InvalidChannelName { .. } => ConfigErrorKind::InvalidChannelName,
            ConfigError::MissingSetting(_) => ConfigErrorKind::MissingSetting,
            ConfigError::InvalidEndpoint { .. } => ConfigErrorKind::InvalidEndpoint,
            ConfigError::InvalidValue { .. } => ConfigErrorKind::InvalidValue,
            ConfigError::Unreadable { .. } => ConfigErrorKind::Unreadable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunErrorKind {
    /// The run's overall deadline elapsed before a terminal step was reached
    DeadlineExceeded,
}
