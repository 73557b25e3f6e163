//! Producer side of the queue: applications hand emails to an [`Outbox`]
//! instead of sending them, and the relay worker delivers them later.

use std::sync::Arc;

use relay_common::{MessageId, NewMessage, OutgoingEmail, Priority};

use crate::r#trait::MessageStore;

#[derive(Debug, Clone)]
pub struct Outbox {
    store: Arc<dyn MessageStore>,
    batch_size: Option<usize>,
}

impl Outbox {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            batch_size: None,
        }
    }

    /// Rows per insert statement for [`Outbox::send_messages`]
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub const fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// Queue a single email
    ///
    /// # Errors
    /// If the email cannot be stored
    pub async fn send(&self, email: &OutgoingEmail, priority: Priority) -> crate::Result<MessageId> {
        let id = self
            .store
            .enqueue(NewMessage::from_email(email, priority)?)
            .await?;

        tracing::debug!(message_id = %id, ?priority, "Queued message");
        Ok(id)
    }

    /// Queue emails at low priority, returning how many were queued
    ///
    /// # Errors
    /// If any email cannot be stored. None of them are queued in that case.
    pub async fn send_messages(&self, emails: &[OutgoingEmail]) -> crate::Result<usize> {
        let messages = emails
            .iter()
            .map(|email| NewMessage::from_email(email, Priority::Low))
            .collect::<Result<Vec<_>, _>>()?;

        let ids = self.store.enqueue_many(messages, self.batch_size).await?;

        tracing::debug!(count = ids.len(), "Queued messages");
        Ok(ids.len())
    }
}
