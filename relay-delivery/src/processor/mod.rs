//! The worker loop: deliver, clean up, report health, sleep, repeat

pub mod cleanup;

use std::sync::Arc;

use relay_common::{Signal, internal};
use relay_health::HealthCheck;
use relay_store::{MessageStore, Outbox};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::{
    DeliveryConfig,
    engine::{DeliveryEngine, PassSummary},
    transport::TransportFactory,
};

/// What one iteration of the worker did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Counters of the delivery pass, if one ran
    pub pass: Option<PassSummary>,
    /// Sent messages removed by retention, if retention is enabled
    pub deleted: Option<u64>,
    /// Whether the health check succeeded, if one is configured
    pub health: Option<bool>,
}

/// Runs delivery passes until told to stop
#[derive(Debug, Clone)]
pub struct RelayWorker {
    engine: DeliveryEngine,
    health: Option<Arc<dyn HealthCheck>>,
}

impl RelayWorker {
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn TransportFactory>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            engine: DeliveryEngine::new(store, transport, config),
            health: None,
        }
    }

    /// Ping `health` after every iteration
    #[must_use]
    pub fn with_health_check(mut self, health: Arc<dyn HealthCheck>) -> Self {
        self.health = Some(health);
        self
    }

    #[must_use]
    pub const fn engine(&self) -> &DeliveryEngine {
        &self.engine
    }

    /// A producer queueing into the same store, chunking bulk inserts by
    /// `messages_batch_size`
    #[must_use]
    pub fn outbox(&self) -> Outbox {
        Outbox::new(Arc::clone(self.engine.store()))
            .with_batch_size(self.engine.config().messages_batch_size)
    }

    /// Deliver whatever is sendable, apply retention, then ping the health
    /// check. Errors are logged and never returned.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn run_iteration(&self) -> IterationReport {
        let store = self.engine.store();
        let config = self.engine.config();

        let pass = match store.has_sendable_messages().await {
            Ok(true) => match self.engine.send_all().await {
                Ok(summary) => Some(summary),
                Err(err) => {
                    error!(error = %err, "Delivery pass failed");
                    None
                }
            },
            Ok(false) => {
                debug!("No sendable messages");
                None
            }
            Err(err) => {
                error!(error = %err, "Failed to check for sendable messages");
                None
            }
        };

        let deleted = cleanup::delete_old_messages(store, config.retention()).await;

        let health = match &self.health {
            Some(health) => Some(Self::ping(health.as_ref()).await),
            None => None,
        };

        IterationReport {
            pass,
            deleted,
            health,
        }
    }

    async fn ping(health: &dyn HealthCheck) -> bool {
        match health.ping().await {
            Ok(()) => {
                debug!("Health check succeeded");
                true
            }
            Err(err) => {
                warn!(error = %err, "Health check failed");
                false
            }
        }
    }

    /// Run iterations until a shutdown signal arrives, or until
    /// `max_iterations` have run.
    ///
    /// The sleep between iterations is cut short by a shutdown signal. An
    /// iteration in progress always runs to completion.
    pub async fn serve(
        &self,
        mut shutdown: broadcast::Receiver<Signal>,
        max_iterations: Option<u64>,
    ) -> IterationReport {
        internal!(level = INFO, "Relay worker starting");

        let sleep = self.engine.config().empty_queue_sleep();
        let mut iterations = 0u64;

        let last = loop {
            let report = self.run_iteration().await;
            iterations += 1;

            if max_iterations.is_some_and(|max| iterations >= max) {
                internal!(level = INFO, "Completed {iterations} iterations, stopping");
                break report;
            }

            if let Ok(Signal::Shutdown) | Err(broadcast::error::TryRecvError::Closed) =
                shutdown.try_recv()
            {
                internal!(level = INFO, "Relay worker received shutdown signal");
                break report;
            }

            if sleep.is_zero() {
                // Nothing in an iteration is guaranteed to suspend
                tokio::task::yield_now().await;
                continue;
            }

            tokio::select! {
                () = tokio::time::sleep(sleep) => {}
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown) => {
                            internal!(level = INFO, "Relay worker received shutdown signal");
                        }
                        Err(err) => {
                            error!("Relay worker shutdown channel error: {err}");
                        }
                    }
                    break report;
                }
            }
        };

        internal!(level = INFO, "Relay worker shutdown complete");
        last
    }
}
