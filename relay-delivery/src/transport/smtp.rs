//! SMTP submission through lettre

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    transport::smtp::{authentication::Credentials, extension::ClientId},
};
use relay_common::{OutgoingEmail, outgoing};
use serde::Deserialize;

use super::{MailTransport, TransportFactory, message};
use crate::{DeliveryError, error::SystemError};

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_port() -> u16 {
    587
}

const fn default_timeout_secs() -> u64 {
    10
}

/// How the connection to the server is secured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TlsMode {
    /// Plain text (local relays and testing only)
    None,
    /// Upgrade with STARTTLS, which the server must support
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (usually port 465)
    Wrapper,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub tls: TlsMode,

    /// Connection and command timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name announced in EHLO (the local hostname if unset)
    #[serde(default)]
    pub hello_name: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            tls: TlsMode::default(),
            timeout_secs: default_timeout_secs(),
            hello_name: None,
        }
    }
}

/// Opens SMTP connections to the configured server
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    config: SmtpConfig,
    default_from: Option<String>,
}

impl SmtpTransport {
    /// # Errors
    /// If credentials are only half configured
    pub fn new(config: SmtpConfig, default_from: Option<String>) -> Result<Self, DeliveryError> {
        if config.username.is_some() != config.password.is_some() {
            return Err(SystemError::Configuration(
                "SMTP username and password must be set together".to_string(),
            )
            .into());
        }

        Ok(Self {
            config,
            default_from,
        })
    }
}

impl TransportFactory for SmtpTransport {
    fn connect(&self) -> Result<Box<dyn MailTransport>, DeliveryError> {
        let host = self.config.host.as_str();

        let mut builder = match self.config.tls {
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?,
            TlsMode::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(host)?,
        };

        builder = builder
            .port(self.config.port)
            .timeout(Some(Duration::from_secs(self.config.timeout_secs)));

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        if let Some(hello_name) = &self.config.hello_name {
            builder = builder.hello_name(ClientId::Domain(hello_name.clone()));
        }

        Ok(Box::new(SmtpConnection {
            transport: builder.build(),
            default_from: self.default_from.clone(),
        }))
    }
}

struct SmtpConnection {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    default_from: Option<String>,
}

#[async_trait]
impl MailTransport for SmtpConnection {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let message = message::build(email, self.default_from.as_deref())?;
        let response = self.transport.send(message).await?;

        outgoing!(
            level = DEBUG,
            "{} accepted message: {}",
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        );

        Ok(())
    }
}
