//! Prints each email to stdout

use async_trait::async_trait;
use relay_common::OutgoingEmail;
use tokio::io::AsyncWriteExt;

use super::{MailTransport, TransportFactory, message};
use crate::DeliveryError;

const SEPARATOR: &[u8] = b"\n-------------------------------------------------------------------------------\n";

#[derive(Debug, Clone)]
pub struct ConsoleTransport {
    default_from: Option<String>,
}

impl ConsoleTransport {
    #[must_use]
    pub const fn new(default_from: Option<String>) -> Self {
        Self { default_from }
    }
}

impl TransportFactory for ConsoleTransport {
    fn connect(&self) -> Result<Box<dyn MailTransport>, DeliveryError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl MailTransport for ConsoleTransport {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let formatted = message::build(email, self.default_from.as_deref())?.formatted();

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&formatted).await?;
        stdout.write_all(SEPARATOR).await?;
        stdout.flush().await?;

        Ok(())
    }
}
