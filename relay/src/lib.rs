//! The relay process: configuration loading and the controller that wires the
//! store, transport and health check into a running worker.

pub mod config;
pub mod controller;

pub use config::find_config_file;
pub use controller::{Relay, SHUTDOWN_BROADCAST};
