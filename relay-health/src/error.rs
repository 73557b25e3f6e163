//! Health check error types

use thiserror::Error;

/// Errors that can occur while pinging the monitoring URL
#[derive(Debug, Error)]
pub enum HealthError {
    /// The monitoring service answered with a different status code
    #[error("Health check returned status {actual}, expected {expected}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    /// The request could not be made (connection refused, timeout, TLS)
    #[cfg(feature = "http")]
    #[error("Health check request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The configured check cannot be built
    #[error("Invalid health check configuration: {0}")]
    InvalidConfig(String),
}
