//! Health-check pings for the relay worker
//!
//! After every iteration the worker can report that it is alive by making a
//! request to an external monitoring URL. Without a URL the check is a no-op.
//!
//! # Usage
//!
//! ```rust,no_run
//! use relay_health::HealthCheckConfig;
//!
//! # async fn example() -> Result<(), relay_health::HealthError> {
//! let config = HealthCheckConfig {
//!     url: Some("https://hc-ping.com/some-uuid".to_string()),
//!     ..HealthCheckConfig::default()
//! };
//!
//! let checker = config.into_checker()?;
//! checker.ping().await?;
//! # Ok(())
//! # }
//! ```

mod checker;
mod config;
mod error;

#[cfg(feature = "http")]
pub use checker::HttpHealthCheck;
pub use checker::{HealthCheck, NoopHealthCheck};
pub use config::HealthCheckConfig;
pub use error::HealthError;
