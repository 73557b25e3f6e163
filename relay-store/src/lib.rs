//! The durable message queue: the [`MessageStore`] trait with its Postgres
//! and in-memory backends, and the producer-side [`Outbox`].

pub mod backends;
pub mod config;
pub mod error;
pub mod outbox;
pub mod r#trait;

pub use backends::{MemoryStore, PostgresStore};
pub use config::{PostgresConfig, StoreConfig};
pub use error::{Result, StoreError};
pub use outbox::Outbox;
pub use r#trait::{ClaimGuard, Claimed, MessageStore};
