// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::worker::{Assignment, WorkerAdapter, WorkerAdapterError};
use async_trait::async_trait;
use drts_core::{JobId, WorkerName};
use tracing::Instrument;

/// Wrapper that adds tracing to any WorkerAdapter
#[derive(Clone)]
pub struct TracedWorker<W> {
    inner: W,
}

impl<W> TracedWorker<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

#[async_trait]
impl<W: WorkerAdapter> WorkerAdapter for TracedWorker<W> {
    async fn dispatch(
        &self,
        worker: &WorkerName,
        assignment: Assignment,
    ) -> Result<(), WorkerAdapterError> {
        let span = tracing::info_span!(
            "worker.dispatch",
            worker = %worker,
            job_id = %assignment.job_id,
            rank = assignment.rank,
        );
        async {
            tracing::info!(peers = assignment.peers.len(), "sending");
            let start = std::time::Instant::now();
            let result = self.inner.dispatch(worker, assignment).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "dispatched"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "dispatch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn cancel(&self, worker: &WorkerName, job_id: &JobId) -> Result<(), WorkerAdapterError> {
        let result = self.inner.cancel(worker, job_id).await;
        tracing::info_span!("worker.cancel", worker = %worker, job_id = %job_id).in_scope(
            || match &result {
                Ok(()) => tracing::info!("cancel sent"),
                Err(e) => tracing::warn!(error = %e, "cancel failed"),
            },
        );
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
