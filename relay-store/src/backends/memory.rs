use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_common::{Message, MessageId, NewMessage, Status, prioritized};

use crate::{
    StoreError,
    r#trait::{ClaimGuard, Claimed, MessageStore},
};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    messages: BTreeMap<MessageId, Message>,
    claimed: HashSet<MessageId>,
}

impl Inner {
    fn insert(&mut self, mut message: Message) -> MessageId {
        self.next_id += 1;
        let id = MessageId::new(self.next_id);
        message.id = id;
        self.messages.insert(id, message);
        id
    }
}

/// In-memory message store
///
/// Messages live in a `BTreeMap` keyed by id, behind a `parking_lot::Mutex`.
/// Claims are tracked in a set of ids: a claimed message is skipped by
/// [`MessageStore::lock_for_sending`] until its [`Claimed`] is committed or
/// dropped.
///
/// Claims only exclude callers sharing this store (clones share state). There
/// is no protection across processes; use the Postgres backend for that.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message exactly as given, apart from its id, which is
    /// assigned by the store.
    ///
    /// This allows seeding messages in any state, with any timestamps.
    pub fn insert(&self, message: Message) -> MessageId {
        self.inner.lock().insert(message)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a claim on `id` is currently held
    #[must_use]
    pub fn is_claimed(&self, id: MessageId) -> bool {
        self.inner.lock().claimed.contains(&id)
    }

    fn delete_sent_where(&self, predicate: impl Fn(&Message) -> bool) -> u64 {
        let mut inner = self.inner.lock();
        let before = inner.messages.len();
        inner
            .messages
            .retain(|_, message| !(message.status == Status::Sent && predicate(message)));
        (before - inner.messages.len()) as u64
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn enqueue(&self, message: NewMessage) -> crate::Result<MessageId> {
        Ok(self.insert(Message::queued(
            MessageId::new(0),
            message.data,
            message.priority,
            Utc::now(),
        )))
    }

    async fn enqueue_many(
        &self,
        messages: Vec<NewMessage>,
        _batch_size: Option<usize>,
    ) -> crate::Result<Vec<MessageId>> {
        let now = Utc::now();
        let mut inner = self.inner.lock();

        Ok(messages
            .into_iter()
            .map(|message| {
                inner.insert(Message::queued(
                    MessageId::new(0),
                    message.data,
                    message.priority,
                    now,
                ))
            })
            .collect())
    }

    async fn select_batch(&self, limit: Option<usize>) -> crate::Result<Vec<Message>> {
        let inner = self.inner.lock();
        let with_status = |status: Status| {
            let mut messages: Vec<Message> = inner
                .messages
                .values()
                .filter(|message| message.status == status)
                .cloned()
                .collect();
            prioritized(&mut messages);
            messages
        };

        let mut batch = with_status(Status::Queued);
        batch.extend(with_status(Status::Deferred));
        if let Some(limit) = limit {
            batch.truncate(limit);
        }

        Ok(batch)
    }

    async fn lock_for_sending(&self, id: MessageId) -> crate::Result<Option<Claimed>> {
        let mut inner = self.inner.lock();

        if inner.claimed.contains(&id) {
            return Ok(None);
        }

        let Some(message) = inner
            .messages
            .get(&id)
            .filter(|message| message.is_sendable())
            .cloned()
        else {
            return Ok(None);
        };

        inner.claimed.insert(id);

        Ok(Some(Claimed::new(
            message,
            Box::new(MemoryClaim {
                id,
                inner: Arc::clone(&self.inner),
            }),
        )))
    }

    async fn has_sendable_messages(&self) -> crate::Result<bool> {
        Ok(self
            .inner
            .lock()
            .messages
            .values()
            .any(Message::is_sendable))
    }

    async fn delete_all_sent(&self) -> crate::Result<u64> {
        Ok(self.delete_sent_where(|_| true))
    }

    async fn delete_sent_before(&self, cutoff: DateTime<Utc>) -> crate::Result<u64> {
        Ok(self.delete_sent_where(|message| {
            message.sent_at.is_some_and(|sent_at| sent_at <= cutoff)
        }))
    }

    async fn get(&self, id: MessageId) -> crate::Result<Message> {
        self.inner
            .lock()
            .messages
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self, status: Option<Status>) -> crate::Result<Vec<Message>> {
        Ok(self
            .inner
            .lock()
            .messages
            .values()
            .filter(|message| status.is_none_or(|status| message.status == status))
            .cloned()
            .collect())
    }
}

#[derive(Debug)]
struct MemoryClaim {
    id: MessageId,
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl ClaimGuard for MemoryClaim {
    async fn commit(self: Box<Self>, message: &Message) -> crate::Result<()> {
        let mut inner = self.inner.lock();
        let stored = inner
            .messages
            .get_mut(&self.id)
            .ok_or(StoreError::NotFound(self.id))?;

        stored.status = message.status;
        stored.log.clone_from(&message.log);
        stored.retry_count = message.retry_count;
        stored.updated_at = message.updated_at;
        stored.sent_at = message.sent_at;

        Ok(())
    }
}

impl Drop for MemoryClaim {
    fn drop(&mut self) {
        self.inner.lock().claimed.remove(&self.id);
    }
}
