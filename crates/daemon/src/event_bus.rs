// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus between listener tasks and the engine loop.
//!
//! Listener tasks never touch agent state. They wrap each event in an
//! [`Envelope`], optionally with a reply channel, and the engine loop
//! answers once the event has been applied.
//!
//! Worker sessions also hand their name binding to the engine loop, so a
//! binding changes in the same order as the registry.

use drts_core::{Event, Job};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::sessions::Outbox;

/// Bound on envelopes waiting for the engine loop.
const BUS_CAPACITY: usize = 256;

/// Verdict of the engine loop on one event
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    /// The collected record of a job freed by `job:collect`
    Collected(Box<Job>),
    /// The event was refused and state is unchanged
    Rejected(String),
}

/// Session binding change that travels with a worker event
#[derive(Debug)]
pub enum Binding {
    /// Bind the registering name to this connection; undone if refused
    Attach { session: u64, outbox: Outbox },
    /// The connection closed. Its loss only counts while it owns the name.
    Detach { session: u64 },
}

/// One event on its way to the engine loop
#[derive(Debug)]
pub struct Envelope {
    pub event: Event,
    pub reply: Option<oneshot::Sender<Reply>>,
    pub binding: Option<Binding>,
}

impl Envelope {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            reply: None,
            binding: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("engine loop has stopped")]
    Closed,
}

/// Sending half, cloned into every listener task.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<Envelope>,
}

/// Receiving half, owned by the engine loop.
pub struct EventReader {
    rx: mpsc::Receiver<Envelope>,
}

impl EventBus {
    pub fn new() -> (Self, EventReader) {
        let (tx, rx) = mpsc::channel(BUS_CAPACITY);
        (Self { tx }, EventReader { rx })
    }

    /// Deliver an event without waiting for its outcome.
    pub async fn send(&self, event: Event) -> Result<(), BusError> {
        self.deliver(Envelope::new(event)).await
    }

    /// Deliver an event and wait for the engine loop's verdict.
    pub async fn request(&self, event: Event) -> Result<Reply, BusError> {
        self.ask(Envelope::new(event)).await
    }

    /// Register a worker on connection `session`, bound to it if accepted.
    pub async fn register(
        &self,
        event: Event,
        session: u64,
        outbox: Outbox,
    ) -> Result<Reply, BusError> {
        self.ask(Envelope {
            binding: Some(Binding::Attach { session, outbox }),
            ..Envelope::new(event)
        })
        .await
    }

    /// Report connection `session` closed with its `worker:lost` event.
    pub async fn close(&self, event: Event, session: u64) -> Result<(), BusError> {
        self.deliver(Envelope {
            binding: Some(Binding::Detach { session }),
            ..Envelope::new(event)
        })
        .await
    }

    async fn ask(&self, mut envelope: Envelope) -> Result<Reply, BusError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        envelope.reply = Some(reply_tx);
        self.deliver(envelope).await?;
        reply_rx.await.map_err(|_| BusError::Closed)
    }

    async fn deliver(&self, envelope: Envelope) -> Result<(), BusError> {
        self.tx.send(envelope).await.map_err(|_| BusError::Closed)
    }
}

impl EventReader {
    /// Next envelope, or `None` once every bus handle is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
