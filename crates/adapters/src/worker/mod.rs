// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker transport adapters
//!
//! The engine never talks to worker processes directly. It hands each
//! dispatch and cancel instruction to a [`WorkerAdapter`], which owns the
//! actual connection.

mod noop;

pub use noop::NoOpWorkerAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeWorkerAdapter, WorkerCall};

use async_trait::async_trait;
use drts_core::{JobId, Peer, WorkerName};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from worker transport operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerAdapterError {
    #[error("worker not connected: {0}")]
    NotConnected(WorkerName),
    #[error("send to {worker} failed: {message}")]
    SendFailed { worker: WorkerName, message: String },
}

/// One worker's share of a job, as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub job_id: JobId,
    /// Position of the receiving worker within `peers`
    pub rank: u32,
    /// The full coallocated worker set, in assignment order
    pub peers: Vec<Peer>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Adapter for delivering instructions to connected workers
#[async_trait]
pub trait WorkerAdapter: Clone + Send + Sync + 'static {
    /// Hand a job fragment to a worker
    async fn dispatch(
        &self,
        worker: &WorkerName,
        assignment: Assignment,
    ) -> Result<(), WorkerAdapterError>;

    /// Ask a worker to stop its share of a job
    async fn cancel(&self, worker: &WorkerName, job_id: &JobId) -> Result<(), WorkerAdapterError>;
}
