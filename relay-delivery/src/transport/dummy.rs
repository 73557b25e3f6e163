use async_trait::async_trait;
use relay_common::OutgoingEmail;

use super::{MailTransport, TransportFactory};
use crate::DeliveryError;

/// Accepts every email and does nothing with it
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyTransport;

impl TransportFactory for DummyTransport {
    fn connect(&self) -> Result<Box<dyn MailTransport>, DeliveryError> {
        Ok(Box::new(Self))
    }
}

#[async_trait]
impl MailTransport for DummyTransport {
    async fn send(&mut self, _email: &OutgoingEmail) -> Result<(), DeliveryError> {
        Ok(())
    }
}
