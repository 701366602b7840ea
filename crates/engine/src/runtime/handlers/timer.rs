// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer event handling

use super::super::Runtime;
use crate::coordinator;
use crate::error::RuntimeError;
use crate::recovery;
use drts_adapters::WorkerAdapter;
use drts_core::{Clock, Effect, Event, JobId, JobState, JobTransition, TimerId, TimerKind, WorkerName};

impl<W, C> Runtime<W, C>
where
    W: WorkerAdapter,
    C: Clock,
{
    /// Route timer events to the appropriate handler
    pub(crate) async fn handle_timer(&self, id: &TimerId) -> Result<Vec<Event>, RuntimeError> {
        match id.kind() {
            TimerKind::Heartbeat(worker) => self.handle_heartbeat_timeout(worker).await,
            TimerKind::AckTimeout(job_id) => self.handle_ack_timeout(&job_id).await,
            TimerKind::Rejoin(worker) => self.handle_rejoin_expired(&worker).await,
            TimerKind::Unknown => {
                tracing::debug!(timer_id = %id, "ignoring unknown timer");
                Ok(vec![])
            }
        }
    }

    async fn handle_heartbeat_timeout(
        &self,
        worker: WorkerName,
    ) -> Result<Vec<Event>, RuntimeError> {
        let live = self
            .state
            .lock()
            .registry
            .get(&worker)
            .is_some_and(|w| !w.lost);
        if !live {
            return Ok(vec![]);
        }
        Ok(self
            .run(vec![Effect::Emit {
                event: Event::WorkerLost {
                    name: worker,
                    reason: "heartbeat timeout".to_string(),
                },
            }])
            .await)
    }

    async fn handle_ack_timeout(&self, job_id: &JobId) -> Result<Vec<Event>, RuntimeError> {
        let effects = self.mutate(|state, _, _| {
            let Some(previous) = state.store.state(job_id) else {
                return Ok(vec![]);
            };
            if !matches!(previous, JobState::Running | JobState::Canceling) {
                return Ok(vec![]);
            }
            let settled = state.store.transition(job_id, JobTransition::AckTimeout)?;
            tracing::warn!(%job_id, from = %previous, "acknowledgement timeout");
            Ok(coordinator::settle(
                &mut state.registry,
                &state.store,
                job_id,
                previous,
                settled,
            ))
        })?;
        Ok(self.run(effects).await)
    }

    async fn handle_rejoin_expired(&self, worker: &WorkerName) -> Result<Vec<Event>, RuntimeError> {
        let effects = self.mutate(|state, config, _| {
            if !state.registry.is_lost(worker) {
                return Ok(vec![]);
            }
            tracing::warn!(%worker, "rejoin grace expired");
            Ok(recovery::apply_loss(state, worker, config.loss_policy))
        })?;
        Ok(self.run(effects).await)
    }
}
