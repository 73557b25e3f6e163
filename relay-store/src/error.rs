//! Error types for the relay-store crate.

use relay_common::{MessageId, PayloadError};
use thiserror::Error;

/// Top-level store error type.
///
/// Every store operation returns this error type, which separates database
/// failures from rows that could not be turned back into messages.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected a query or could not be reached.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the embedded migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A payload could not be encoded for storage.
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Message not found in the store.
    #[error("Message not found: {0}")]
    NotFound(MessageId),

    /// A stored row holds values outside the message model.
    #[error("Invalid row for message {id}: {reason}")]
    InvalidRow { id: MessageId, reason: String },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
