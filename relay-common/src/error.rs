//! Error types for the relay-common crate.

use thiserror::Error;

/// Errors raised while decoding a stored message payload.
///
/// A payload that fails to decode will never succeed on a later attempt, so
/// callers treat these as permanent failures of the message.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The stored JSON does not describe an email.
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A discriminant read back from storage is out of range.
    #[error("Unknown {kind} value: {value}")]
    UnknownDiscriminant { kind: &'static str, value: i16 },
}
