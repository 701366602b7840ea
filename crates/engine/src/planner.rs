// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placement planner: chooses worker sets for PENDING jobs
//!
//! Planning is pure. It reads the registry and the store and proposes one
//! placement per job that can be satisfied right now; the coordinator then
//! re-validates and commits each proposal.

use crate::registry::WorkerRegistry;
use crate::store::JobStore;
use drts_core::{JobId, WorkerName};
use std::collections::HashMap;

/// A candidate worker set for one job, in rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub job_id: JobId,
    pub workers: Vec<WorkerName>,
}

/// Propose placements for PENDING jobs in submission order.
///
/// Slots promised to earlier jobs in the same pass count toward load, so
/// proposals never overbook a worker. A job that cannot be satisfied is
/// skipped and does not block later jobs.
pub fn plan(registry: &WorkerRegistry, store: &JobStore) -> Vec<Placement> {
    let mut planned: HashMap<WorkerName, usize> = HashMap::new();
    let mut placements = Vec::new();

    for job in store.pending() {
        let degree = job.degree() as usize;
        let workers = registry.rank_candidates(
            &job.requirements.capabilities,
            degree,
            &planned,
            &job.draining,
        );
        if workers.len() < degree {
            tracing::trace!(
                job_id = %job.id,
                degree,
                eligible = workers.len(),
                "not enough eligible workers, job stays pending"
            );
            continue;
        }
        for worker in &workers {
            *planned.entry(worker.clone()).or_insert(0) += 1;
        }
        placements.push(Placement {
            job_id: job.id.clone(),
            workers,
        });
    }

    placements
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
