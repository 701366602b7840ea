// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op worker adapter.

use super::{Assignment, WorkerAdapter, WorkerAdapterError};
use async_trait::async_trait;
use drts_core::{JobId, WorkerName};

/// Worker adapter that accepts and discards every instruction.
///
/// Useful for dry runs of the scheduler where workers are simulated by
/// feeding acknowledgement events by hand.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpWorkerAdapter;

impl NoOpWorkerAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkerAdapter for NoOpWorkerAdapter {
    async fn dispatch(
        &self,
        _worker: &WorkerName,
        _assignment: Assignment,
    ) -> Result<(), WorkerAdapterError> {
        Ok(())
    }

    async fn cancel(&self, _worker: &WorkerName, _job_id: &JobId) -> Result<(), WorkerAdapterError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "noop_tests.rs"]
mod tests;
