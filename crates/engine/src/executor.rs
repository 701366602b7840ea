// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor

use crate::Scheduler;
use drts_adapters::{Assignment, WorkerAdapter, WorkerAdapterError};
use drts_core::{Clock, Effect, Event, JobUpdate, TracedEffect, WorkerName};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::Instrument;

/// Errors that can occur during effect execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("send to worker {worker} failed: {source}")]
    Send {
        worker: WorkerName,
        #[source]
        source: WorkerAdapterError,
    },
}

/// Executes effects using the configured worker adapter
pub struct Executor<W, C: Clock> {
    workers: W,
    scheduler: Arc<Mutex<Scheduler>>,
    clock: C,
    updates: broadcast::Sender<JobUpdate>,
}

impl<W, C> Executor<W, C>
where
    W: WorkerAdapter,
    C: Clock,
{
    pub fn new(
        workers: W,
        scheduler: Arc<Mutex<Scheduler>>,
        clock: C,
        updates: broadcast::Sender<JobUpdate>,
    ) -> Self {
        Self {
            workers,
            scheduler,
            clock,
            updates,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn scheduler(&self) -> Arc<Mutex<Scheduler>> {
        Arc::clone(&self.scheduler)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.updates.subscribe()
    }

    /// Execute a single effect with tracing
    ///
    /// Returns an optional event that should be fed back into the dispatcher.
    pub async fn execute(&self, effect: Effect) -> Result<Option<Event>, ExecuteError> {
        let span = tracing::info_span!("effect", effect = effect.name());
        async {
            tracing::debug!(fields = ?effect.fields(), "executing");

            let start = std::time::Instant::now();
            let result = self.execute_inner(effect).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(event) => tracing::debug!(elapsed_ms, has_event = event.is_some(), "completed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    /// Execute effects in order, turning failed sends into `worker:lost` events.
    pub async fn execute_all(&self, effects: Vec<Effect>) -> Vec<Event> {
        let mut events = Vec::new();
        for effect in effects {
            match self.execute(effect).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(ExecuteError::Send { worker, source }) => events.push(Event::WorkerLost {
                    name: worker,
                    reason: source.to_string(),
                }),
            }
        }
        events
    }

    async fn execute_inner(&self, effect: Effect) -> Result<Option<Event>, ExecuteError> {
        match effect {
            Effect::Emit { event } => Ok(Some(event)),

            Effect::Dispatch {
                job_id,
                worker,
                rank,
                peers,
                payload,
            } => {
                let assignment = Assignment {
                    job_id,
                    rank,
                    peers,
                    payload,
                };
                self.workers
                    .dispatch(&worker, assignment)
                    .await
                    .map_err(|source| ExecuteError::Send { worker, source })?;
                Ok(None)
            }

            Effect::Cancel { job_id, worker } => {
                self.workers
                    .cancel(&worker, &job_id)
                    .await
                    .map_err(|source| ExecuteError::Send { worker, source })?;
                Ok(None)
            }

            Effect::SetTimer { id, duration } => {
                let now = self.clock.now();
                self.scheduler.lock().set_timer(id, duration, now);
                Ok(None)
            }

            Effect::CancelTimer { id } => {
                self.scheduler.lock().cancel_timer(&id);
                Ok(None)
            }

            Effect::Publish { update } => {
                // No subscribers is fine.
                let _ = self.updates.send(update);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
