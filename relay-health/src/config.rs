//! Health check configuration

use std::{sync::Arc, time::Duration};

use serde::Deserialize;

use crate::{
    HealthError,
    checker::{HealthCheck, NoopHealthCheck},
};

/// Configuration for the health-check ping
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthCheckConfig {
    /// URL to request after every worker iteration
    ///
    /// When unset, no request is made.
    #[serde(default)]
    pub url: Option<String>,

    /// HTTP method of the request
    #[serde(default = "default_method")]
    pub method: String,

    /// Status code that counts as healthy
    #[serde(default = "default_status")]
    pub status: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

fn default_method() -> String {
    "GET".to_string()
}

const fn default_status() -> u16 {
    200
}

const fn default_timeout_secs() -> f64 {
    5.0
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            url: None,
            method: default_method(),
            status: default_status(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HealthCheckConfig {
    /// The request timeout; negative or non-finite values fall back to the default
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_timeout_secs()))
    }

    /// Build the configured health check
    ///
    /// # Errors
    /// If the method is not a valid HTTP method, or a URL is configured but
    /// HTTP support was not compiled in
    pub fn into_checker(self) -> Result<Arc<dyn HealthCheck>, HealthError> {
        let Some(url) = self.url.clone() else {
            return Ok(Arc::new(NoopHealthCheck));
        };

        #[cfg(feature = "http")]
        {
            Ok(Arc::new(crate::checker::HttpHealthCheck::new(url, &self)?))
        }

        #[cfg(not(feature = "http"))]
        {
            Err(HealthError::InvalidConfig(format!(
                "health check url {url} configured, but HTTP support is disabled"
            )))
        }
    }
}
