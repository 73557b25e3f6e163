//! Health check implementations

use std::fmt::Debug;

use async_trait::async_trait;

use crate::HealthError;

/// A liveness report made once per worker iteration
#[async_trait]
pub trait HealthCheck: Send + Sync + Debug {
    /// # Errors
    /// If the monitoring service could not be reached or did not answer with
    /// the expected status
    async fn ping(&self) -> Result<(), HealthError>;
}

/// Used when no monitoring URL is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHealthCheck;

#[async_trait]
impl HealthCheck for NoopHealthCheck {
    async fn ping(&self) -> Result<(), HealthError> {
        Ok(())
    }
}

#[cfg(feature = "http")]
pub use http::HttpHealthCheck;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;

    use super::HealthCheck;
    use crate::{HealthCheckConfig, HealthError};

    /// Pings a URL over HTTP(S)
    #[derive(Debug, Clone)]
    pub struct HttpHealthCheck {
        client: reqwest::Client,
        url: String,
        method: reqwest::Method,
        status: u16,
    }

    impl HttpHealthCheck {
        /// # Errors
        /// If the configured method is not a valid HTTP method or the client
        /// cannot be built
        pub fn new(url: String, config: &HealthCheckConfig) -> Result<Self, HealthError> {
            let method = reqwest::Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
                .map_err(|_| {
                    HealthError::InvalidConfig(format!("invalid HTTP method {}", config.method))
                })?;

            let client = reqwest::Client::builder().timeout(config.timeout()).build()?;

            Ok(Self {
                client,
                url,
                method,
                status: config.status,
            })
        }
    }

    #[async_trait]
    impl HealthCheck for HttpHealthCheck {
        async fn ping(&self) -> Result<(), HealthError> {
            let response = self
                .client
                .request(self.method.clone(), &self.url)
                .send()
                .await?;

            let actual = response.status().as_u16();
            if actual != self.status {
                return Err(HealthError::UnexpectedStatus {
                    expected: self.status,
                    actual,
                });
            }

            tracing::debug!(url = %self.url, status = actual, "Health check succeeded");
            Ok(())
        }
    }
}
