//! Shared types for the relay: the queued [`Message`] and its state machine,
//! the serialized [`EmailPayload`] and its materialized [`OutgoingEmail`], and
//! the logging setup used by every crate in the workspace.

pub mod email;
pub mod error;
pub mod logging;
pub mod message;

pub use email::{Alternative, Attachment, AttachmentData, EmailPayload, OutgoingEmail};
pub use error::PayloadError;
pub use message::{Message, MessageId, NewMessage, Priority, Status, prioritized};
pub use tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
