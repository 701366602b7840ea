// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker adapter backed by open worker sessions.
//!
//! Each registered worker connection owns an outbox drained by its writer
//! task. The runtime's dispatch and cancel effects are pushed into the
//! outbox of the session currently bound to the worker's name.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use drts_adapters::{Assignment, WorkerAdapter, WorkerAdapterError};
use drts_core::{JobId, WorkerName};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// The connection currently speaking for a worker name
#[derive(Debug, Clone)]
pub struct Session {
    id: u64,
    outbox: Outbox,
}

#[derive(Clone, Default)]
pub struct WorkerSessions {
    bound: Arc<Mutex<HashMap<WorkerName, Session>>>,
    next_id: Arc<AtomicU64>,
}

impl WorkerSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a new connection.
    pub fn open(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Bind `name` to connection `id`, returning the session it replaced.
    pub fn attach(&self, name: &WorkerName, id: u64, outbox: Outbox) -> Option<Session> {
        self.bound.lock().insert(name.clone(), Session { id, outbox })
    }

    /// Undo a refused `attach`, unless another connection has bound the name since.
    pub fn restore(&self, name: &WorkerName, id: u64, previous: Option<Session>) {
        let mut bound = self.bound.lock();
        if bound.get(name).is_some_and(|s| s.id == id) {
            match previous {
                Some(session) => bound.insert(name.clone(), session),
                None => bound.remove(name),
            };
        }
    }

    /// Unbind connection `id`. False when a newer connection owns the name.
    pub fn detach(&self, name: &WorkerName, id: u64) -> bool {
        let mut bound = self.bound.lock();
        if bound.get(name).is_some_and(|s| s.id == id) {
            bound.remove(name);
            true
        } else {
            false
        }
    }

    fn push(&self, worker: &WorkerName, message: ServerMessage) -> Result<(), WorkerAdapterError> {
        let outbox = self
            .bound
            .lock()
            .get(worker)
            .map(|s| s.outbox.clone())
            .ok_or_else(|| WorkerAdapterError::NotConnected(worker.clone()))?;
        outbox
            .send(message)
            .map_err(|_| WorkerAdapterError::SendFailed {
                worker: worker.clone(),
                message: "session closed".to_string(),
            })
    }
}

#[async_trait]
impl WorkerAdapter for WorkerSessions {
    async fn dispatch(
        &self,
        worker: &WorkerName,
        assignment: Assignment,
    ) -> Result<(), WorkerAdapterError> {
        self.push(worker, ServerMessage::Dispatch { assignment })
    }

    async fn cancel(&self, worker: &WorkerName, job_id: &JobId) -> Result<(), WorkerAdapterError> {
        self.push(
            worker,
            ServerMessage::Cancel {
                job_id: job_id.clone(),
            },
        )
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
