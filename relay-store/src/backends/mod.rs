//! Backing store implementations for the message queue
//!
//! - `memory`: In-memory storage for tests and single-process development
//! - `postgres`: PostgreSQL storage for production use

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
