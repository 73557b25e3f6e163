use std::sync::Arc;

use serde::Deserialize;

use crate::{
    backends::{MemoryStore, PostgresStore},
    r#trait::MessageStore,
};

/// Configuration for the message store
///
/// # Examples
///
/// PostgreSQL store in RON config:
/// ```ron
/// Relay (
///     store: Postgres((
///         url: "postgres://relay@localhost/relay",
///         max_connections: 10,
///     )),
/// )
/// ```
///
/// Memory store for development (messages are lost on exit):
/// ```ron
/// Relay (
///     store: Memory,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StoreConfig {
    /// PostgreSQL store (production)
    Postgres(PostgresConfig),
    /// Memory store (testing/development)
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Postgres(PostgresConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostgresConfig {
    /// Connection URL of the queue database
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a free pool connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Apply pending migrations on connect
    #[serde(default = "default_migrate")]
    pub migrate: bool,
}

fn default_url() -> String {
    "postgres://localhost/relay".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_acquire_timeout_secs() -> u64 {
    30
}

const fn default_migrate() -> bool {
    true
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            migrate: default_migrate(),
        }
    }
}

impl StoreConfig {
    /// Replace the database URL of a Postgres store. Memory stores are
    /// returned unchanged.
    #[must_use]
    pub fn with_database_url(self, url: impl Into<String>) -> Self {
        match self {
            Self::Postgres(config) => Self::Postgres(PostgresConfig {
                url: url.into(),
                ..config
            }),
            Self::Memory => Self::Memory,
        }
    }

    /// Convert the configuration into a concrete store
    ///
    /// # Errors
    /// If the database cannot be reached or its migrations fail
    pub async fn into_store(self) -> crate::Result<Arc<dyn MessageStore>> {
        match self {
            Self::Postgres(config) => Ok(Arc::new(PostgresStore::connect(&config).await?)),
            Self::Memory => Ok(Arc::new(MemoryStore::new())),
        }
    }
}
