//! Delivery for the relay: mail transports, the [`DeliveryEngine`] that runs a
//! single pass over the store, and the [`RelayWorker`] loop around it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use relay_delivery::{DeliveryConfig, MemoryOutbox, RelayWorker};
//! use relay_store::MemoryStore;
//!
//! # async fn example() {
//! let outbox = MemoryOutbox::new();
//! let worker = RelayWorker::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(outbox.clone()),
//!     DeliveryConfig::default(),
//! );
//!
//! let report = worker.run_iteration().await;
//! assert!(report.pass.is_none());
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod processor;
pub mod transport;

pub use config::DeliveryConfig;
pub use engine::{DeliveryEngine, PassSummary};
pub use error::{DeliveryError, PermanentError, SystemError, TemporaryError};
pub use processor::{IterationReport, RelayWorker, cleanup::delete_old_messages};
pub use transport::{
    ConsoleTransport, DummyTransport, FileTransport, MailTransport, MemoryOutbox, SmtpConfig,
    SmtpTransport, TlsMode, TransportBackend, TransportConfig, TransportFactory,
};
