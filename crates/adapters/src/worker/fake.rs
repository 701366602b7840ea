// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake worker adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Assignment, WorkerAdapter, WorkerAdapterError};
use async_trait::async_trait;
use drts_core::{JobId, WorkerName};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Recorded worker call
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerCall {
    Dispatch {
        worker: WorkerName,
        assignment: Assignment,
    },
    Cancel {
        worker: WorkerName,
        job_id: JobId,
    },
}

#[derive(Default)]
struct FakeWorkerState {
    calls: Vec<WorkerCall>,
    unreachable: HashSet<WorkerName>,
}

/// Fake worker adapter that records every instruction
#[derive(Clone, Default)]
pub struct FakeWorkerAdapter {
    inner: Arc<Mutex<FakeWorkerState>>,
}

impl FakeWorkerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<WorkerCall> {
        self.inner.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear(&self) {
        self.inner.lock().calls.clear();
    }

    /// Dispatches recorded for a job, in send order
    pub fn dispatches(&self, job_id: &JobId) -> Vec<(WorkerName, Assignment)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                WorkerCall::Dispatch { worker, assignment } if &assignment.job_id == job_id => {
                    Some((worker.clone(), assignment.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Workers that were told to cancel a job, in send order
    pub fn cancels(&self, job_id: &JobId) -> Vec<WorkerName> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                WorkerCall::Cancel { worker, job_id: id } if id == job_id => Some(worker.clone()),
                _ => None,
            })
            .collect()
    }

    /// Make every send to `worker` fail until [`Self::restore`] is called
    pub fn fail_for(&self, worker: &str) {
        self.inner.lock().unreachable.insert(WorkerName::new(worker));
    }

    pub fn restore(&self, worker: &str) {
        self.inner.lock().unreachable.remove(&WorkerName::new(worker));
    }

    fn check(&self, worker: &WorkerName) -> Result<(), WorkerAdapterError> {
        if self.inner.lock().unreachable.contains(worker) {
            return Err(WorkerAdapterError::NotConnected(worker.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkerAdapter for FakeWorkerAdapter {
    async fn dispatch(
        &self,
        worker: &WorkerName,
        assignment: Assignment,
    ) -> Result<(), WorkerAdapterError> {
        self.check(worker)?;
        self.inner.lock().calls.push(WorkerCall::Dispatch {
            worker: worker.clone(),
            assignment,
        });
        Ok(())
    }

    async fn cancel(&self, worker: &WorkerName, job_id: &JobId) -> Result<(), WorkerAdapterError> {
        self.check(worker)?;
        self.inner.lock().calls.push(WorkerCall::Cancel {
            worker: worker.clone(),
            job_id: job_id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
