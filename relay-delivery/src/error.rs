//! Typed error handling for delivery operations.
//!
//! This module provides structured error types that distinguish between:
//! - Temporary failures: the message is deferred and retried on a later pass
//! - Permanent failures: the message is failed and never retried
//! - System errors: problems of the relay itself (store, configuration)

use relay_common::PayloadError;
use relay_store::StoreError;
use thiserror::Error;

/// Top-level delivery error type.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Permanent failure that should not be retried.
    #[error("Permanent failure: {0}")]
    Permanent(#[from] PermanentError),

    /// Temporary failure that can be retried on a later pass.
    #[error("Temporary failure: {0}")]
    Temporary(#[from] TemporaryError),

    /// System-level error.
    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// Temporary errors, exactly the set of conditions eligible for deferral.
#[derive(Debug, Error)]
pub enum TemporaryError {
    /// The server rejected our credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The server refused the message data.
    #[error("Data rejected: {0}")]
    DataRejected(String),

    /// The server refused the recipients.
    #[error("Recipients refused: {0}")]
    RecipientsRefused(String),

    /// The server refused the sender.
    #[error("Sender refused: {0}")]
    SenderRefused(String),

    /// I/O, connection, timeout or TLS failure.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Permanent errors that should not be retried.
#[derive(Debug, Error)]
pub enum PermanentError {
    /// An address in the message cannot be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The message cannot be built or its payload cannot be decoded.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Any other failure while sending.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// System-level errors that indicate internal problems.
#[derive(Debug, Error)]
pub enum SystemError {
    /// The message store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Other internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeliveryError {
    /// Returns `true` if this error is temporary and the message should be
    /// deferred.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Returns `true` if this error is permanent and should not be retried.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// Returns `true` if this is a system error.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// The innermost description, recorded on the message's log
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Permanent(err) => err.to_string(),
            Self::Temporary(err) => err.to_string(),
            Self::System(err) => err.to_string(),
        }
    }
}

impl From<StoreError> for DeliveryError {
    fn from(error: StoreError) -> Self {
        Self::System(SystemError::Store(error))
    }
}

impl From<PayloadError> for DeliveryError {
    fn from(error: PayloadError) -> Self {
        Self::Permanent(PermanentError::InvalidMessage(error.to_string()))
    }
}

impl From<std::io::Error> for DeliveryError {
    fn from(error: std::io::Error) -> Self {
        Self::Temporary(TemporaryError::Io(error.to_string()))
    }
}

/// Classify a reply code from the server.
///
/// Codes are matched on their three-digit form, so both 4xx and 5xx replies
/// of the same kind land in the same class.
fn classify_reply(code: &str, error: String) -> TemporaryError {
    match code {
        "454" | "530" | "534" | "535" | "538" => TemporaryError::AuthenticationFailed(error),
        "550" | "551" | "553" => TemporaryError::RecipientsRefused(error),
        "555" => TemporaryError::SenderRefused(error),
        _ => TemporaryError::DataRejected(error),
    }
}

/// Convert a lettre SMTP error to `DeliveryError`.
///
/// - **Server replies** are Temporary, classified by reply code
/// - **Client errors** (raised before anything reaches the server) are Permanent
/// - **Timeouts, TLS and connection failures** are Temporary I/O errors
impl From<lettre::transport::smtp::Error> for DeliveryError {
    fn from(error: lettre::transport::smtp::Error) -> Self {
        if let Some(code) = error.status() {
            return Self::Temporary(classify_reply(&code.to_string(), error.to_string()));
        }

        if error.is_client() {
            return Self::Permanent(PermanentError::Unexpected(error.to_string()));
        }

        Self::Temporary(TemporaryError::Io(error.to_string()))
    }
}

impl From<lettre::transport::file::Error> for DeliveryError {
    fn from(error: lettre::transport::file::Error) -> Self {
        Self::Temporary(TemporaryError::Io(error.to_string()))
    }
}

impl From<lettre::address::AddressError> for DeliveryError {
    fn from(error: lettre::address::AddressError) -> Self {
        Self::Permanent(PermanentError::InvalidAddress(error.to_string()))
    }
}

impl From<lettre::error::Error> for DeliveryError {
    fn from(error: lettre::error::Error) -> Self {
        Self::Permanent(PermanentError::InvalidMessage(error.to_string()))
    }
}
