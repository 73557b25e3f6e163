use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_common::{Message, MessageId, NewMessage, Status};

/// Trait for the durable message queue
///
/// Implementations must make [`MessageStore::lock_for_sending`] exclusive:
/// while one [`Claimed`] for a message is alive, no other caller (in this
/// process or, for shared backends, any other) can claim the same message.
#[async_trait]
pub trait MessageStore: Send + Sync + Debug {
    /// Insert a single message with status Queued
    ///
    /// # Errors
    /// If the message cannot be persisted
    async fn enqueue(&self, message: NewMessage) -> crate::Result<MessageId>;

    /// Insert many messages, `batch_size` rows per statement (all of them
    /// in one statement when `None`). The ids are returned in the order of
    /// `messages`.
    ///
    /// # Errors
    /// If any chunk cannot be persisted. No message is inserted in that case.
    async fn enqueue_many(
        &self,
        messages: Vec<NewMessage>,
        batch_size: Option<usize>,
    ) -> crate::Result<Vec<MessageId>>;

    /// Select the messages for one delivery pass.
    ///
    /// Queued messages come first, then Deferred ones, each group ordered by
    /// priority (highest first) and then age (oldest first). At most `limit`
    /// messages are returned. Nothing is locked.
    ///
    /// # Errors
    /// If the query fails
    async fn select_batch(&self, limit: Option<usize>) -> crate::Result<Vec<Message>>;

    /// Claim a message for a delivery attempt.
    ///
    /// Returns `None` when the message is claimed by someone else, is no
    /// longer Queued or Deferred, or no longer exists. Never waits for
    /// another claim to be released.
    ///
    /// # Errors
    /// If the query fails
    async fn lock_for_sending(&self, id: MessageId) -> crate::Result<Option<Claimed>>;

    /// Whether any Queued or Deferred message exists
    ///
    /// # Errors
    /// If the query fails
    async fn has_sendable_messages(&self) -> crate::Result<bool>;

    /// # Errors
    /// If the query fails
    async fn delete_all_sent(&self) -> crate::Result<u64>;

    /// Delete Sent messages whose `sent_at` is at or before `cutoff`
    ///
    /// # Errors
    /// If the query fails
    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> crate::Result<u64>;

    /// # Errors
    /// [`crate::StoreError::NotFound`] if no such message exists
    async fn get(&self, id: MessageId) -> crate::Result<Message>;

    /// Every message, optionally only those in `status`, ordered by id
    ///
    /// # Errors
    /// If the query fails
    async fn list(&self, status: Option<Status>) -> crate::Result<Vec<Message>>;
}

/// The backend half of a claim: the open unit of work holding the lock
///
/// Dropping a guard without committing releases the lock and discards any
/// change.
#[async_trait]
pub trait ClaimGuard: Send + Debug {
    /// Persist the message's state and release the lock
    ///
    /// # Errors
    /// If the update or the commit fails. The lock is released either way.
    async fn commit(self: Box<Self>, message: &Message) -> crate::Result<()>;
}

/// A message locked for a single delivery attempt
#[derive(Debug)]
pub struct Claimed {
    message: Message,
    guard: Box<dyn ClaimGuard>,
}

impl Claimed {
    #[must_use]
    pub fn new(message: Message, guard: Box<dyn ClaimGuard>) -> Self {
        Self { message, guard }
    }

    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }

    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.message.id
    }

    /// # Errors
    /// If the new state cannot be persisted
    pub async fn mark_sent(self) -> crate::Result<Message> {
        self.finish(|message, now| message.mark_sent(now)).await
    }

    /// # Errors
    /// If the new state cannot be persisted
    pub async fn mark_deferred(self, log: impl Into<String> + Send) -> crate::Result<Message> {
        let log = log.into();
        self.finish(|message, now| message.defer(log, now)).await
    }

    /// # Errors
    /// If the new state cannot be persisted
    pub async fn mark_failed(self, log: impl Into<String> + Send) -> crate::Result<Message> {
        let log = log.into();
        self.finish(|message, now| message.fail(log, now)).await
    }

    async fn finish(
        self,
        transition: impl FnOnce(&mut Message, DateTime<Utc>) + Send,
    ) -> crate::Result<Message> {
        let Self { mut message, guard } = self;
        transition(&mut message, Utc::now());
        guard.commit(&message).await?;
        Ok(message)
    }
}
