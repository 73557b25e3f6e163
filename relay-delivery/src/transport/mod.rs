//! Mail transports: the capability that hands a materialized email to the
//! outside world.
//!
//! A [`TransportFactory`] is created once from configuration. The delivery
//! engine asks it for a fresh [`MailTransport`] connection lazily, reuses that
//! connection for consecutive messages, and throws it away after any failure.

pub mod console;
pub mod dummy;
pub mod file;
pub mod memory;
pub mod message;
pub mod smtp;

use std::{fmt::Debug, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use relay_common::OutgoingEmail;
use serde::Deserialize;

pub use console::ConsoleTransport;
pub use dummy::DummyTransport;
pub use file::FileTransport;
pub use memory::MemoryOutbox;
pub use smtp::{SmtpConfig, SmtpTransport, TlsMode};

use crate::DeliveryError;

/// An open connection to a mail transport
#[async_trait]
pub trait MailTransport: Send {
    /// Transmit a single email
    ///
    /// # Errors
    /// A [`DeliveryError::Temporary`] when the send may succeed on a later
    /// attempt, any other variant when it will not.
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), DeliveryError>;
}

/// Opens [`MailTransport`] connections
pub trait TransportFactory: Send + Sync + Debug {
    /// # Errors
    /// If a connection cannot be set up; classified like a failed send
    fn connect(&self) -> Result<Box<dyn MailTransport>, DeliveryError>;
}

/// Which transport to deliver through
///
/// # Examples
///
/// ```ron
/// transport: (
///     backend: Smtp((
///         host: "smtp.example.com",
///         username: Some("relay"),
///         password: Some("secret"),
///     )),
///     default_from: Some("noreply@example.com"),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum TransportBackend {
    Smtp(SmtpConfig),
    /// Write each email as an `.eml` file into `path`
    File { path: PathBuf },
    /// Print each email to stdout
    Console,
    /// Accept and discard everything
    Dummy,
}

impl Default for TransportBackend {
    fn default() -> Self {
        Self::Smtp(SmtpConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub backend: TransportBackend,

    /// Sender used for emails stored without a `from_email`
    #[serde(default)]
    pub default_from: Option<String>,
}

impl TransportConfig {
    /// Build the factory for the configured backend
    ///
    /// # Errors
    /// If the backend configuration is invalid
    pub fn into_factory(self) -> Result<Arc<dyn TransportFactory>, DeliveryError> {
        let default_from = self.default_from;

        Ok(match self.backend {
            TransportBackend::Smtp(config) => Arc::new(SmtpTransport::new(config, default_from)?),
            TransportBackend::File { path } => Arc::new(FileTransport::new(path, default_from)),
            TransportBackend::Console => Arc::new(ConsoleTransport::new(default_from)),
            TransportBackend::Dummy => Arc::new(DummyTransport),
        })
    }
}
