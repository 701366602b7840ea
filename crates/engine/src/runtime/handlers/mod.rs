// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handling for the runtime

mod job;
mod timer;
mod worker;

use super::Runtime;
use crate::error::RuntimeError;
use drts_adapters::WorkerAdapter;
use drts_core::{Clock, Event};

impl<W, C> Runtime<W, C>
where
    W: WorkerAdapter,
    C: Clock,
{
    /// Handle an incoming event and return any produced events
    ///
    /// Produced events (failed sends reported as `worker:lost`, expired
    /// heartbeats) must be fed back through this method by the caller.
    pub async fn handle_event(&self, event: Event) -> Result<Vec<Event>, RuntimeError> {
        tracing::debug!(event = %event.log_summary(), "handling");

        match &event {
            Event::WorkerRegister { registration } => {
                self.handle_register(registration.clone()).await
            }

            Event::WorkerHeartbeat { name } => self.handle_heartbeat(name).await,

            Event::WorkerLost { name, reason } => self.handle_worker_lost(name, reason).await,

            Event::JobSubmit {
                id,
                requirements,
                payload,
            } => {
                self.handle_submit(id, requirements.clone(), payload.clone())
                    .await
            }

            Event::JobFinished { .. } | Event::JobFailed { .. } | Event::JobCancelAck { .. } => {
                match event.as_ack() {
                    Some((id, worker, ack)) => self.handle_ack(id, worker, ack).await,
                    None => Ok(vec![]),
                }
            }

            Event::JobCancel { id } => self.handle_cancel(id).await,

            Event::JobCollect { id } => {
                let (_, events) = self.collect(id).await?;
                Ok(events)
            }

            Event::TimerFired { id } => self.handle_timer(id).await,

            // The daemon stops its loop; the runtime has nothing to undo.
            Event::Shutdown => Ok(vec![]),
        }
    }
}
