//! An in-process transport that records what it was asked to deliver.
//!
//! Failures can be scripted, either once (the next connect or send fails) or
//! for every email addressed to a given recipient.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_common::OutgoingEmail;

use super::{MailTransport, TransportFactory};
use crate::DeliveryError;

type FailureFn = fn() -> DeliveryError;

#[derive(Debug, Default)]
struct State {
    sent: Vec<OutgoingEmail>,
    attempts: usize,
    connects: usize,
    next_send_failures: VecDeque<DeliveryError>,
    next_connect_failures: VecDeque<DeliveryError>,
    failing_recipients: HashMap<String, FailureFn>,
}

/// Collects delivered emails in memory
///
/// Clones share the same outbox, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutbox {
    state: Arc<Mutex<State>>,
}

impl MemoryOutbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every email delivered so far, in delivery order
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.state.lock().sent.clone()
    }

    /// Number of sends attempted, successful or not
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Number of connections opened
    #[must_use]
    pub fn connects(&self) -> usize {
        self.state.lock().connects
    }

    /// Fail the next send with `error`. Queued failures apply in order.
    pub fn fail_next_send(&self, error: DeliveryError) {
        self.state.lock().next_send_failures.push_back(error);
    }

    /// Fail the next connect with `error`. Queued failures apply in order.
    pub fn fail_next_connect(&self, error: DeliveryError) {
        self.state.lock().next_connect_failures.push_back(error);
    }

    /// Fail every send to `recipient` with the error built by `failure`
    pub fn fail_recipient(&self, recipient: impl Into<String>, failure: FailureFn) {
        self.state
            .lock()
            .failing_recipients
            .insert(recipient.into(), failure);
    }

    pub fn clear(&self) {
        *self.state.lock() = State::default();
    }
}

impl TransportFactory for MemoryOutbox {
    fn connect(&self) -> Result<Box<dyn MailTransport>, DeliveryError> {
        let mut state = self.state.lock();
        state.connects += 1;

        if let Some(error) = state.next_connect_failures.pop_front() {
            return Err(error);
        }

        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl MailTransport for MemoryOutbox {
    async fn send(&mut self, email: &OutgoingEmail) -> Result<(), DeliveryError> {
        let mut state = self.state.lock();
        state.attempts += 1;

        if let Some(error) = state.next_send_failures.pop_front() {
            return Err(error);
        }

        if let Some(failure) = email
            .recipients()
            .find_map(|recipient| state.failing_recipients.get(recipient))
        {
            return Err(failure());
        }

        state.sent.push(email.clone());
        Ok(())
    }
}
