//! Notification channel management

pub mod validation;

pub use validation::{
    validate_channel_name, validate_recipient, ChannelValidationError, Recipient,
    RecipientValidationError,
};
