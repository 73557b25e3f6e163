use std::sync::LazyLock;

use anyhow::Context;
use relay_common::{Signal, internal};
use relay_delivery::{DeliveryConfig, IterationReport, RelayWorker, TransportConfig};
use relay_health::HealthCheckConfig;
use relay_store::{PostgresStore, StoreConfig};
use serde::Deserialize;
use tokio::sync::broadcast;

/// The whole process configuration
///
/// # Examples
///
/// ```ron
/// Relay (
///     store: Postgres((url: "postgres://relay@localhost/relay")),
///     transport: (
///         backend: Smtp((host: "smtp.example.com")),
///         default_from: Some("noreply@example.com"),
///     ),
///     delivery: (
///         max_retries: Some(5),
///         retention_secs: Some(604800),
///     ),
///     health: (url: Some("https://hc.example.com/ping/relay")),
/// )
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Relay {
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    transport: TransportConfig,
    #[serde(default)]
    delivery: DeliveryConfig,
    #[serde(default)]
    health: HealthCheckConfig,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

#[tracing::instrument(level = "trace")]
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    // The worker finishes its current iteration first; a second CTRL+C stops
    // waiting for it.
    loop {
        tokio::select! {
            sig = receiver.recv() => {
                match sig {
                    Ok(s) => tracing::debug!("Received {s:?}"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!("Received: {e:?}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    Ok(())
}

impl Relay {
    /// Parse a RON configuration document
    ///
    /// # Errors
    /// If the document is not a valid configuration
    pub fn from_ron(document: &str) -> anyhow::Result<Self> {
        ron::from_str(document).context("Invalid relay configuration")
    }

    /// Point a Postgres store at `url` instead of the configured database
    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.store = self.store.with_database_url(url);
        self
    }

    #[must_use]
    pub const fn delivery(&self) -> &DeliveryConfig {
        &self.delivery
    }

    /// Build the worker: open the store, set up the transport and the health
    /// check
    ///
    /// # Errors
    /// If the store cannot be opened or the transport or health check are
    /// misconfigured
    pub async fn worker(self) -> anyhow::Result<RelayWorker> {
        let store = self
            .store
            .into_store()
            .await
            .context("Failed to open the message store")?;
        let transport = self
            .transport
            .into_factory()
            .context("Invalid transport configuration")?;

        let mut worker = RelayWorker::new(store, transport, self.delivery);

        if self.health.url.is_some() {
            let health = self
                .health
                .into_checker()
                .context("Invalid health check configuration")?;
            worker = worker.with_health_check(health);
        }

        Ok(worker)
    }

    /// Run the worker until a shutdown signal, or for `max_iterations`
    ///
    /// # Errors
    /// If the worker cannot be built, or signal handling cannot be set up
    #[tracing::instrument(level = "trace", skip(self), err)]
    pub async fn run(self, max_iterations: Option<u64>) -> anyhow::Result<IterationReport> {
        let worker = self.worker().await?;

        internal!(level = INFO, "Controller running");

        let ret = tokio::select! {
            report = worker.serve(SHUTDOWN_BROADCAST.subscribe(), max_iterations) => {
                Ok(report)
            }
            r = shutdown() => {
                r.map(|()| IterationReport::default())
            }
        };

        internal!(level = INFO, "Shutting down...");

        ret
    }

    /// Apply the store migrations and return
    ///
    /// # Errors
    /// If the database cannot be reached or a migration fails
    pub async fn migrate(self) -> anyhow::Result<()> {
        match self.store {
            StoreConfig::Postgres(config) => {
                let config = relay_store::PostgresConfig {
                    migrate: false,
                    ..config
                };
                let store = PostgresStore::connect(&config)
                    .await
                    .context("Failed to connect to the database")?;
                store.migrate().await.context("Failed to apply migrations")?;
                internal!(level = INFO, "Migrations applied");
            }
            StoreConfig::Memory => {
                internal!(level = INFO, "The memory store has nothing to migrate");
            }
        }

        Ok(())
    }
}
