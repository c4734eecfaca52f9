//! Notification channel and recipient validation
//!
//! Channel names follow topic naming rules; recipients must have the shape
//! `local-part@domain`. Both are checked once, when configuration is resolved.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during channel name validation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChannelValidationError {
    #[error("Channel name is empty")]
    Empty,

    #[error("Channel name is too long (max 256 characters)")]
    TooLong,

    #[error("Channel name contains invalid characters (only letters, numbers, hyphens, and underscores allowed)")]
    InvalidCharacters,
}

/// Errors that can occur during recipient validation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecipientValidationError {
    #[error("Recipient '{0}' has no '@' separator")]
    MissingSeparator(String),

    #[error("Recipient '{0}' has an empty or invalid local part")]
    InvalidLocalPart(String),

    #[error("Recipient '{0}' has an empty or invalid domain")]
    InvalidDomain(String),
}

impl RecipientValidationError {
    /// The offending recipient value
    pub fn value(&self) -> &str {
        match self {
            RecipientValidationError::MissingSeparator(v)
            | RecipientValidationError::InvalidLocalPart(v)
            | RecipientValidationError::InvalidDomain(v) => v,
        }
    }
}

const MAX_CHANNEL_NAME_LEN: usize = 256;

/// Special characters allowed in the local part besides ASCII alphanumerics
const LOCAL_PART_SPECIALS: &str = ".!#$%&'*+/=?^_`{|}~-";

/// Validate a notification channel name
pub fn validate_channel_name(name: &str) -> Result<(), ChannelValidationError> {
    if name.is_empty() {
        return Err(ChannelValidationError::Empty);
    }

    if name.len() > MAX_CHANNEL_NAME_LEN {
        return Err(ChannelValidationError::TooLong);
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ChannelValidationError::InvalidCharacters);
    }

    Ok(())
}

/// Validate a recipient address. No trimming: surrounding whitespace is invalid.
pub fn validate_recipient(address: &str) -> Result<(), RecipientValidationError> {
    let (local, domain) = address
        .split_once('@')
        .ok_or_else(|| RecipientValidationError::MissingSeparator(address.to_string()))?;

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || LOCAL_PART_SPECIALS.contains(c))
    {
        return Err(RecipientValidationError::InvalidLocalPart(
            address.to_string(),
        ));
    }

    let labels_valid = domain.split('.').all(|label| {
        !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_valid {
        return Err(RecipientValidationError::InvalidDomain(address.to_string()));
    }

    Ok(())
}

/// A validated notification recipient
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Recipient(String);

impl Recipient {
    pub fn parse(address: &str) -> Result<Self, RecipientValidationError> {
        validate_recipient(address)?;
        Ok(Self(address.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Recipient {
    type Error = RecipientValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_recipient(&value)?;
        Ok(Self(value))
    }
}

impl From<Recipient> for String {
    fn from(recipient: Recipient) -> Self {
        recipient.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
