//! Retention of Sent messages

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use relay_store::MessageStore;
use tracing::{debug, error};

/// Delete Sent messages that are older than `retention`
///
/// A zero retention deletes every Sent message regardless of age. Returns
/// `None` when retention is disabled or the store failed.
#[tracing::instrument(level = "debug", skip(store), ret)]
pub async fn delete_old_messages(
    store: &Arc<dyn MessageStore>,
    retention: Option<Duration>,
) -> Option<u64> {
    let retention = retention?;

    let result = if retention.is_zero() {
        store.delete_all_sent().await
    } else {
        match chrono::Duration::from_std(retention) {
            Ok(window) => {
                let cutoff = Utc::now()
                    .checked_sub_signed(window)
                    .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
                store.delete_sent_before(cutoff).await
            }
            // Longer than chrono can represent, nothing is that old
            Err(_) => Ok(0),
        }
    };

    match result {
        Ok(deleted) => {
            debug!(deleted, "Deleted sent messages past retention");
            Some(deleted)
        }
        Err(err) => {
            error!(error = %err, "Failed to delete sent messages");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;
    use relay_common::{Message, MessageId, Priority, Status};
    use relay_store::MemoryStore;

    use super::*;

    fn sent(store: &MemoryStore, ago: TimeDelta) -> MessageId {
        let sent_at = Utc::now() - ago;
        let mut message = Message::queued(
            MessageId::new(0),
            serde_json::json!({}),
            Priority::Low,
            sent_at,
        );
        message.mark_sent(sent_at);
        store.insert(message)
    }

    #[tokio::test]
    async fn test_disabled_retention_keeps_everything() {
        let memory = MemoryStore::new();
        sent(&memory, TimeDelta::days(365));
        let store: Arc<dyn MessageStore> = Arc::new(memory.clone());

        assert_eq!(delete_old_messages(&store, None).await, None);
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_retention_deletes_all_sent() {
        let memory = MemoryStore::new();
        for _ in 0..10 {
            sent(&memory, TimeDelta::zero());
        }
        memory.insert(Message::queued(
            MessageId::new(0),
            serde_json::json!({}),
            Priority::Low,
            Utc::now(),
        ));
        let store: Arc<dyn MessageStore> = Arc::new(memory.clone());

        assert_eq!(delete_old_messages(&store, Some(Duration::ZERO)).await, Some(10));

        let remaining = store.list(None).await.expect("Failed to list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].status, Status::Queued);
    }

    #[tokio::test]
    async fn test_window_deletes_only_older_messages() {
        let memory = MemoryStore::new();
        let old = sent(&memory, TimeDelta::seconds(601));
        let recent = sent(&memory, TimeDelta::seconds(5));
        let store: Arc<dyn MessageStore> = Arc::new(memory.clone());

        assert_eq!(
            delete_old_messages(&store, Some(Duration::from_secs(600))).await,
            Some(1)
        );
        assert!(store.get(old).await.is_err());
        assert!(store.get(recent).await.is_ok());
    }
}
