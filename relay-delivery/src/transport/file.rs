//! Writes each email as an `.eml` file, for development and inspection

use std::path::PathBuf;

use async_trait::async_trait;
use lettre::{AsyncFileTransport, AsyncTransport, Tokio1Executor};
use relay_common::{OutgoingEmail, outgoing};

use super::{MailTransport, TransportFactory, message};
use crate::DeliveryError;

#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
    default_from: Option<String>,
}

impl FileTransport {
    #[must_use]
    pub const fn new(path: PathBuf, default_from: Option<String>) -> Self {
        Self { path, default_from }
    }
}

impl TransportFactory for FileTransport {
    fn connect(&self) -> Result<Box<dyn MailTransport>, DeliveryError> {
        Ok(Box::new(FileConnection {
            transport: AsyncFileTransport::<Tokio1Executor>::new(&self.path),
            default_from: self.default_from.clone(),
        }))
    }
}

struct FileConnection {
    transport: AsyncFileTransport<Tokio1Executor>,
    default_from: Option<String>,
}

#[async_trait]
impl MailTransport for FileConnection {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let message = message::build(email, self.default_from.as_deref())?;
        let id = self.transport.send(message).await?;

        outgoing!(level = DEBUG, "Wrote message to {id}.eml");
        Ok(())
    }
}
