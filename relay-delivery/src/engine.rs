//! One delivery pass over the sendable messages of a store

use std::sync::Arc;

use relay_common::OutgoingEmail;
use relay_store::{Claimed, MessageStore, StoreError};
use tracing::{debug, error, info, warn};

use crate::{
    DeliveryConfig, DeliveryError,
    transport::{MailTransport, TransportFactory},
};

/// Counters of a single [`DeliveryEngine::send_all`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub sent: usize,
    /// Messages moved to Deferred. Escalations after exhausted retries count
    /// as `failed`.
    pub deferred: usize,
    pub failed: usize,
    /// Messages that could not be claimed: locked by another worker, already
    /// finished, deleted, or the claim itself failed
    pub skipped: usize,
}

impl PassSummary {
    /// Messages that reached a new state in this pass
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.sent + self.deferred + self.failed
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::Deferred => self.deferred += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Deferred,
    Failed,
}

/// Sends queued and deferred messages through a mail transport
#[derive(Debug, Clone)]
pub struct DeliveryEngine {
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn TransportFactory>,
    config: DeliveryConfig,
}

impl DeliveryEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn TransportFactory>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Run one pass over the current batch.
    ///
    /// Each message is claimed, sent and marked in its own unit of work, in the
    /// order the batch was selected. A message another worker holds is
    /// skipped. Failures of a single message never end the pass.
    ///
    /// # Errors
    /// Only if the batch cannot be selected
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn send_all(&self) -> Result<PassSummary, DeliveryError> {
        let batch = self.store.select_batch(self.config.max_batch).await?;
        let throttle = self.config.throttle();
        let max_deferred = self
            .config
            .max_deferred
            .map(|max| usize::try_from(max).unwrap_or(usize::MAX));

        debug!(count = batch.len(), "Selected messages for delivery");

        let mut summary = PassSummary::default();
        let mut connection = None;

        for message in batch {
            let claimed = match self.store.lock_for_sending(message.id).await {
                Ok(Some(claimed)) => claimed,
                Ok(None) => {
                    debug!(message_id = %message.id, "Message is locked or no longer sendable, skipping");
                    summary.skipped += 1;
                    continue;
                }
                Err(err) => {
                    error!(message_id = %message.id, error = %err, "Failed to claim message");
                    summary.skipped += 1;
                    continue;
                }
            };

            let id = claimed.id();
            match self.deliver(claimed, &mut connection).await {
                Ok(outcome) => summary.record(outcome),
                Err(err) => {
                    error!(message_id = %id, error = %err, "Failed to record delivery outcome");
                }
            }

            if max_deferred.is_some_and(|max| summary.deferred >= max) {
                info!(
                    deferred = summary.deferred,
                    "Deferred limit reached, ending pass early"
                );
                break;
            }

            if let Some(throttle) = throttle {
                debug!("Throttling for {}s", throttle.as_secs_f64());
                tokio::time::sleep(throttle).await;
            }
        }

        info!(
            "sent {} emails, deferred {} emails, failed {} emails",
            summary.sent, summary.deferred, summary.failed
        );

        Ok(summary)
    }

    async fn deliver(
        &self,
        claimed: Claimed,
        connection: &mut Option<Box<dyn MailTransport>>,
    ) -> Result<Outcome, StoreError> {
        let email = match claimed.message().email() {
            Ok(Some(email)) => email,
            Ok(None) => {
                let log = format!("Message {} has no email object", claimed.id());
                warn!(message_id = %claimed.id(), "{log}");
                claimed.mark_failed(log).await?;
                return Ok(Outcome::Failed);
            }
            Err(err) => {
                let err = DeliveryError::from(err);
                warn!(message_id = %claimed.id(), error = %err, "Message payload cannot be decoded");
                claimed.mark_failed(err.detail()).await?;
                return Ok(Outcome::Failed);
            }
        };

        match self.attempt(&email, connection).await {
            Ok(()) => {
                debug!(message_id = %claimed.id(), "Sent {}", claimed.message());
                claimed.mark_sent().await?;
                Ok(Outcome::Sent)
            }
            Err(err) if err.is_temporary() => self.retry_or_fail(claimed, &err).await,
            Err(err) => {
                error!(message_id = %claimed.id(), error = %err, "Unexpected failure sending message");
                claimed.mark_failed(err.detail()).await?;
                Ok(Outcome::Failed)
            }
        }
    }

    /// Send through the open connection, connecting first if there is none.
    /// The connection is only kept when the send succeeds.
    async fn attempt(
        &self,
        email: &OutgoingEmail,
        connection: &mut Option<Box<dyn MailTransport>>,
    ) -> Result<(), DeliveryError> {
        let mut transport = match connection.take() {
            Some(transport) => transport,
            None => self.transport.connect()?,
        };

        transport.send(email).await?;
        *connection = Some(transport);

        Ok(())
    }

    async fn retry_or_fail(
        &self,
        claimed: Claimed,
        err: &DeliveryError,
    ) -> Result<Outcome, StoreError> {
        let id = claimed.id();
        let retry_count = claimed.message().retry_count;
        let detail = err.detail();

        if self
            .config
            .max_retries
            .is_some_and(|max| retry_count >= max)
        {
            warn!(message_id = %id, retry_count, error = %detail, "Retries exhausted, failing message");
            claimed.mark_failed(detail).await?;
            return Ok(Outcome::Failed);
        }

        debug!(message_id = %id, retry_count, error = %detail, "Deferring message");
        claimed.mark_deferred(detail).await?;
        Ok(Outcome::Deferred)
    }
}
