// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure and restart handling for lost and rejoining workers

use crate::coordinator;
use crate::runtime::LossPolicy;
use crate::state::AgentState;
use drts_core::{Effect, JobState, JobTransition, WorkerName};

/// Settle every job `worker` holds a slot for, as if it will never answer.
///
/// RUNNING jobs are returned to PENDING when the policy or the job allows
/// reassignment; everything else fails and drains the surviving workers.
pub fn apply_loss(
    state: &mut AgentState,
    worker: &WorkerName,
    policy: LossPolicy,
) -> Vec<Effect> {
    let mut effects = Vec::new();
    for job_id in state.registry.assignments(worker) {
        let Some(job) = state.store.get(&job_id) else {
            // Collected while the worker was away.
            state.registry.release(worker, &job_id);
            continue;
        };
        if !job.holds(worker) {
            state.registry.release(worker, &job_id);
            continue;
        }
        let previous = job.state;
        let requeue = policy == LossPolicy::Requeue || job.requirements.reassignable;
        let transition = JobTransition::WorkerLost {
            worker: worker.clone(),
            requeue,
        };
        match state.store.transition(&job_id, transition) {
            Ok(settled) => {
                if let Some(state_now) = state.store.state(&job_id) {
                    if state_now != previous {
                        tracing::info!(%job_id, %worker, from = %previous, to = %state_now, "job settled after worker loss");
                    }
                }
                effects.extend(coordinator::settle(
                    &mut state.registry,
                    &state.store,
                    &job_id,
                    previous,
                    settled,
                ));
            }
            Err(e) => {
                tracing::warn!(%job_id, %worker, error = %e, "loss not applicable to job");
            }
        }
    }
    effects
}

/// Jobs a lost worker is still expected to answer.
pub fn has_outstanding_work(state: &AgentState, worker: &WorkerName) -> bool {
    state
        .registry
        .assignments(worker)
        .iter()
        .filter_map(|id| state.store.get(id))
        .any(|job| job.holds(worker))
}

/// Reconcile the jobs of a worker that re-registered under a lost name.
///
/// Running shares are resumed without re-dispatch: the worker's own replayed
/// ack drives the job on. Cancels the worker missed while it was away are
/// sent again.
pub fn resume(state: &AgentState, worker: &WorkerName) -> Vec<Effect> {
    let mut effects = Vec::new();
    for job_id in state.registry.assignments(worker) {
        let Some(job) = state.store.get(&job_id) else {
            continue;
        };
        if !job.holds(worker) {
            continue;
        }
        let draining = job.draining.contains(worker);
        if draining || job.state == JobState::Canceling {
            tracing::info!(%job_id, %worker, state = %job.state, "re-sending cancel to rejoined worker");
            effects.push(Effect::Cancel {
                job_id: job_id.clone(),
                worker: worker.clone(),
            });
        } else {
            tracing::info!(%job_id, %worker, "resuming job on rejoined worker");
        }
    }
    effects
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
