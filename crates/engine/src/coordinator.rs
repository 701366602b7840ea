// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coallocation coordinator: all-or-nothing reservation and ack settlement

use crate::planner::Placement;
use crate::registry::{RegistryError, WorkerRegistry};
use crate::store::JobStore;
use drts_core::{Effect, JobError, JobId, JobState, JobUpdate, Settled, TimerId, WorkerName};
use std::time::Duration;
use thiserror::Error;

/// Why a reservation was abandoned. The job stays PENDING.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    #[error("candidate {worker} rejected: {source}")]
    Candidate {
        worker: WorkerName,
        #[source]
        source: RegistryError,
    },
    #[error(transparent)]
    Job(#[from] JobError),
}

/// Atomically reserve every worker in `placement` and start the job.
///
/// Phase one takes a slot on each candidate in order, re-validating it.
/// If any candidate refuses, or the job refuses the set, every slot taken so
/// far is released and nothing else changes.
pub fn reserve(
    registry: &mut WorkerRegistry,
    store: &mut JobStore,
    placement: Placement,
    ack_timeout: Option<Duration>,
) -> Result<Vec<Effect>, ReservationError> {
    let Placement { job_id, workers } = placement;
    let required = store.require(&job_id)?.requirements.capabilities.clone();

    let mut taken: Vec<&WorkerName> = Vec::with_capacity(workers.len());
    for worker in &workers {
        if let Err(source) = registry.reserve(worker, &job_id, &required) {
            rollback(registry, &job_id, &taken);
            return Err(ReservationError::Candidate {
                worker: worker.clone(),
                source,
            });
        }
        taken.push(worker);
    }

    let transition = drts_core::JobTransition::Reserve {
        workers: workers.clone(),
    };
    if let Err(e) = store.transition(&job_id, transition) {
        rollback(registry, &job_id, &taken);
        return Err(e.into());
    }

    let job = store.require(&job_id)?;
    let peers: Vec<_> = workers.iter().map(|w| registry.peer(w)).collect();
    let mut effects: Vec<Effect> = workers
        .iter()
        .enumerate()
        .map(|(rank, worker)| Effect::Dispatch {
            job_id: job_id.clone(),
            worker: worker.clone(),
            rank: rank as u32,
            peers: peers.clone(),
            payload: job.payload.clone(),
        })
        .collect();
    if let Some(duration) = ack_timeout {
        effects.push(Effect::SetTimer {
            id: TimerId::ack_timeout(&job_id),
            duration,
        });
    }
    effects.push(Effect::Publish {
        update: JobUpdate {
            id: job_id,
            state: JobState::Running,
        },
    });
    Ok(effects)
}

fn rollback(registry: &mut WorkerRegistry, job_id: &JobId, taken: &[&WorkerName]) {
    for worker in taken {
        registry.release(worker, job_id);
    }
}

/// Turn the worker-side consequences of a transition into registry updates
/// and effects.
///
/// Released slots are returned to the registry. Cancels go only to workers
/// that are still connected; lost workers get theirs again if they rejoin.
pub fn settle(
    registry: &mut WorkerRegistry,
    store: &JobStore,
    job_id: &JobId,
    previous: JobState,
    settled: Settled,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    for worker in &settled.released {
        registry.release(worker, job_id);
    }
    for worker in settled.to_cancel {
        if registry.is_lost(&worker) {
            tracing::debug!(%job_id, %worker, "worker lost, cancel deferred until rejoin");
            continue;
        }
        effects.push(Effect::Cancel {
            job_id: job_id.clone(),
            worker,
        });
    }

    let Some(state) = store.state(job_id) else {
        return effects;
    };
    if state != previous {
        let was_active = matches!(previous, JobState::Running | JobState::Canceling);
        let is_active = matches!(state, JobState::Running | JobState::Canceling);
        if was_active && !is_active {
            effects.push(Effect::CancelTimer {
                id: TimerId::ack_timeout(job_id),
            });
        }
        effects.push(Effect::Publish {
            update: JobUpdate {
                id: job_id.clone(),
                state,
            },
        });
    }
    effects
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
