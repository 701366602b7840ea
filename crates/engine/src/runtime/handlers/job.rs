// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job event handling

use super::super::Runtime;
use crate::coordinator;
use crate::error::RuntimeError;
use drts_adapters::WorkerAdapter;
use drts_core::{
    Clock, Effect, Event, Job, JobId, JobState, JobTransition, JobUpdate, Requirements, WorkerAck,
    WorkerName,
};

impl<W, C> Runtime<W, C>
where
    W: WorkerAdapter,
    C: Clock,
{
    pub(crate) async fn handle_submit(
        &self,
        id: &JobId,
        requirements: Requirements,
        payload: serde_json::Value,
    ) -> Result<Vec<Event>, RuntimeError> {
        let effects = self.mutate(|state, _, now_ms| {
            let job = state
                .store
                .submit(id.clone(), requirements, payload, now_ms)?;
            tracing::info!(
                job_id = %job.id,
                degree = job.degree(),
                capabilities = %job.requirements.capabilities,
                "job submitted"
            );
            Ok(vec![Effect::Publish {
                update: JobUpdate {
                    id: id.clone(),
                    state: JobState::Pending,
                },
            }])
        })?;
        Ok(self.run(effects).await)
    }

    pub(crate) async fn handle_ack(
        &self,
        id: &JobId,
        worker: &WorkerName,
        ack: WorkerAck,
    ) -> Result<Vec<Event>, RuntimeError> {
        let effects = self.mutate(|state, _, _| {
            state.registry.require(worker)?;
            let previous = state.store.require(id)?.state;
            let kind = ack.name();
            let settled = state.store.transition(
                id,
                JobTransition::Ack {
                    worker: worker.clone(),
                    ack,
                },
            )?;
            tracing::info!(job_id = %id, %worker, ack = kind, "worker answered");
            Ok(coordinator::settle(
                &mut state.registry,
                &state.store,
                id,
                previous,
                settled,
            ))
        })?;
        Ok(self.run(effects).await)
    }

    pub(crate) async fn handle_cancel(&self, id: &JobId) -> Result<Vec<Event>, RuntimeError> {
        let effects = self.mutate(|state, _, _| {
            let previous = state.store.require(id)?.state;
            let settled = state.store.transition(id, JobTransition::Cancel)?;
            tracing::info!(job_id = %id, from = %previous, "job cancel requested");
            Ok(coordinator::settle(
                &mut state.registry,
                &state.store,
                id,
                previous,
                settled,
            ))
        })?;
        Ok(self.run(effects).await)
    }

    /// Hand out a terminal job's record and free it.
    ///
    /// Slots still held by draining workers are released, which may let
    /// waiting jobs run; the events produced by that are returned alongside.
    pub async fn collect(&self, id: &JobId) -> Result<(Job, Vec<Event>), RuntimeError> {
        let mut collected = None;
        let effects = self.mutate(|state, _, _| {
            let job = state.store.collect(id)?;
            for worker in &job.draining {
                state.registry.release(worker, id);
            }
            tracing::info!(job_id = %id, state = %job.state, "job collected");
            collected = Some(job);
            Ok(vec![])
        })?;
        let events = self.run(effects).await;
        match collected {
            Some(job) => Ok((job, events)),
            None => Err(drts_core::JobError::Unknown(id.clone()).into()),
        }
    }
}
