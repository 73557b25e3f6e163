//! The queued message and its delivery state machine
//!
//! ```text
//! Queued   --success-->                 Sent     (terminal)
//! Queued   --transient failure-->       Deferred
//! Deferred --success-->                 Sent     (terminal)
//! Deferred --transient, under ceiling-> Deferred (retry_count + 1)
//! Deferred --transient, at ceiling-->   Failed   (terminal)
//! any      --permanent failure-->       Failed   (terminal)
//! ```

use std::{
    cmp::Reverse,
    fmt::{self, Display, Formatter},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    email::{EmailPayload, OutgoingEmail},
    error::PayloadError,
};

/// Identifier assigned by the store when a message is enqueued.
///
/// Identifiers increase monotonically with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Low = 1,
    Medium = 2,
    High = 3,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Queued = 1,
    Deferred = 2,
    Failed = 3,
    Sent = 4,
}

macro_rules! stored_discriminant {
    ($ty:ident, $kind:literal, [$($variant:ident),+]) => {
        impl $ty {
            /// The value persisted in the store
            #[must_use]
            pub const fn as_i16(self) -> i16 {
                self as i16
            }
        }

        impl TryFrom<i16> for $ty {
            type Error = PayloadError;

            fn try_from(value: i16) -> Result<Self, Self::Error> {
                $(
                    if value == Self::$variant as i16 {
                        return Ok(Self::$variant);
                    }
                )+

                Err(PayloadError::UnknownDiscriminant { kind: $kind, value })
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

stored_discriminant!(Priority, "priority", [Low, Medium, High]);
stored_discriminant!(Status, "status", [Queued, Deferred, Failed, Sent]);

impl Status {
    /// Queued and Deferred messages are eligible for a delivery attempt
    #[must_use]
    pub const fn is_sendable(self) -> bool {
        matches!(self, Self::Queued | Self::Deferred)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }
}

/// A message waiting to be inserted by the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub data: serde_json::Value,
    pub priority: Priority,
}

impl NewMessage {
    /// # Errors
    /// If the payload cannot be represented as JSON.
    pub fn new(payload: &EmailPayload, priority: Priority) -> Result<Self, PayloadError> {
        Ok(Self {
            data: payload.to_value()?,
            priority,
        })
    }

    /// # Errors
    /// If the email cannot be represented as JSON.
    pub fn from_email(email: &OutgoingEmail, priority: Priority) -> Result<Self, PayloadError> {
        Self::new(&EmailPayload::from_email(email), priority)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub data: serde_json::Value,
    pub priority: Priority,
    pub status: Status,
    /// Number of times this message has been deferred
    pub retry_count: u32,
    /// Most recent transport error or failure reason
    pub log: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set exactly once, on delivery
    pub sent_at: Option<DateTime<Utc>>,
}

impl Message {
    /// A freshly queued message, as the store would insert it
    #[must_use]
    pub fn queued(id: MessageId, data: serde_json::Value, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            id,
            data,
            priority,
            status: Status::Queued,
            retry_count: 0,
            log: String::new(),
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    #[must_use]
    pub const fn is_sendable(&self) -> bool {
        self.status.is_sendable()
    }

    pub fn mark_sent(&mut self, now: DateTime<Utc>) {
        self.status = Status::Sent;
        self.sent_at = Some(now);
        self.updated_at = now;
    }

    pub fn defer(&mut self, log: impl Into<String>, now: DateTime<Utc>) {
        self.status = Status::Deferred;
        self.log = log.into();
        self.retry_count += 1;
        self.updated_at = now;
    }

    pub fn fail(&mut self, log: impl Into<String>, now: DateTime<Utc>) {
        self.status = Status::Failed;
        self.log = log.into();
        self.updated_at = now;
    }

    /// Decode the stored payload.
    ///
    /// Returns `Ok(None)` when nothing was stored (`null` or `{}`).
    ///
    /// # Errors
    /// If the stored JSON is not an email payload.
    pub fn payload(&self) -> Result<Option<EmailPayload>, PayloadError> {
        match &self.data {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => Ok(None),
            data => Ok(Some(EmailPayload::deserialize(data)?)),
        }
    }

    /// Materialize the email for a transport.
    ///
    /// Returns `Ok(None)` when there is nothing deliverable: no payload, or a
    /// payload without a single recipient.
    ///
    /// # Errors
    /// If the stored JSON is not an email payload.
    pub fn email(&self) -> Result<Option<OutgoingEmail>, PayloadError> {
        Ok(self
            .payload()?
            .map(|payload| payload.to_email())
            .filter(OutgoingEmail::has_recipients))
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.payload() {
            Ok(Some(payload)) => write!(
                f,
                "{} \"{}\" to {}",
                self.created_at,
                payload.subject,
                payload.to.join(", ")
            ),
            _ => write!(f, "{} <invalid message>", self.created_at),
        }
    }
}

/// Sort into delivery order: highest priority first, then oldest first.
///
/// The id breaks ties between messages created in the same instant, which is
/// common for bulk inserts.
pub fn prioritized(messages: &mut [Message]) {
    messages.sort_by_key(|message| (Reverse(message.priority), message.created_at, message.id));
}
