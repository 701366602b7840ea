// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker registry: connected workers, their capabilities and load

use drts_core::{CapabilitySet, JobId, Peer, Registration, WorkerName, WorkerRecord};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Errors from registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("worker {0} is already registered and live")]
    DuplicateRegistration(WorkerName),
    #[error("unknown worker: {0}")]
    UnknownWorker(WorkerName),
    #[error("worker {0} is lost")]
    Lost(WorkerName),
    #[error("worker {0} has no free slot")]
    NoFreeSlot(WorkerName),
    #[error("worker {worker} lacks capabilities required by job {job_id}")]
    Ineligible { worker: WorkerName, job_id: JobId },
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    /// First registration under this name.
    New,
    /// A lost record was re-bound to the registering process.
    Rejoined,
}

/// All workers known to the agent, keyed by name.
///
/// Records are never removed: a lost worker stays so that jobs referencing
/// its name remain resolvable until it rejoins or its jobs are settled.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<WorkerName, WorkerRecord>,
    default_slots: u32,
}

impl WorkerRegistry {
    pub fn new(default_slots: u32) -> Self {
        Self {
            workers: BTreeMap::new(),
            default_slots: default_slots.max(1),
        }
    }

    pub fn register(
        &mut self,
        registration: Registration,
        now_ms: u64,
    ) -> Result<Registered, RegistryError> {
        match self.workers.get_mut(&registration.name) {
            Some(record) if !record.lost => Err(RegistryError::DuplicateRegistration(
                registration.name.clone(),
            )),
            Some(record) => {
                record.rebind(registration, self.default_slots, now_ms);
                Ok(Registered::Rejoined)
            }
            None => {
                let record = WorkerRecord::new(registration, self.default_slots, now_ms);
                self.workers.insert(record.name.clone(), record);
                Ok(Registered::New)
            }
        }
    }

    /// Mark a worker lost. Returns `false` when it already was.
    pub fn mark_lost(&mut self, name: &WorkerName, now_ms: u64) -> Result<bool, RegistryError> {
        let record = self
            .workers
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownWorker(name.clone()))?;
        if record.lost {
            return Ok(false);
        }
        record.lost = true;
        record.lost_at_ms = Some(now_ms);
        Ok(true)
    }

    /// A clean disconnect is handled exactly like a loss.
    pub fn deregister(&mut self, name: &WorkerName, now_ms: u64) -> Result<bool, RegistryError> {
        self.mark_lost(name, now_ms)
    }

    pub fn get(&self, name: &WorkerName) -> Option<&WorkerRecord> {
        self.workers.get(name)
    }

    pub fn require(&self, name: &WorkerName) -> Result<&WorkerRecord, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownWorker(name.clone()))
    }

    /// Require a known worker that is not lost.
    pub fn require_live(&self, name: &WorkerName) -> Result<&WorkerRecord, RegistryError> {
        let record = self.require(name)?;
        if record.lost {
            return Err(RegistryError::Lost(name.clone()));
        }
        Ok(record)
    }

    pub fn is_lost(&self, name: &WorkerName) -> bool {
        self.workers.get(name).is_some_and(|w| w.lost)
    }

    pub fn workers(&self) -> impl Iterator<Item = &WorkerRecord> {
        self.workers.values()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Up to `count` distinct eligible workers, least loaded first, ties by name.
    pub fn find_candidates(&self, required: &CapabilitySet, count: usize) -> Vec<WorkerName> {
        self.rank_candidates(required, count, &HashMap::new(), &BTreeSet::new())
    }

    /// Candidate ranking with extra not-yet-committed load per worker and
    /// an exclusion set.
    pub(crate) fn rank_candidates(
        &self,
        required: &CapabilitySet,
        count: usize,
        planned: &HashMap<WorkerName, usize>,
        exclude: &BTreeSet<WorkerName>,
    ) -> Vec<WorkerName> {
        let mut ranked: Vec<(usize, &WorkerName)> = self
            .workers
            .values()
            .filter(|w| !w.lost && !exclude.contains(&w.name))
            .filter(|w| required.is_subset_of(&w.capabilities))
            .filter_map(|w| {
                let load = w.load() + planned.get(&w.name).copied().unwrap_or(0);
                (load < w.slots as usize).then_some((load, &w.name))
            })
            .collect();
        ranked.sort();
        ranked
            .into_iter()
            .take(count)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Take a slot on `name` for `job_id`, re-checking eligibility.
    pub fn reserve(
        &mut self,
        name: &WorkerName,
        job_id: &JobId,
        required: &CapabilitySet,
    ) -> Result<(), RegistryError> {
        let record = self
            .workers
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownWorker(name.clone()))?;
        if record.lost {
            return Err(RegistryError::Lost(name.clone()));
        }
        if !required.is_subset_of(&record.capabilities) {
            return Err(RegistryError::Ineligible {
                worker: name.clone(),
                job_id: job_id.clone(),
            });
        }
        if !record.has_free_slot() || record.assignments.contains(job_id) {
            return Err(RegistryError::NoFreeSlot(name.clone()));
        }
        record.assignments.insert(job_id.clone());
        Ok(())
    }

    /// Free the slot `name` holds for `job_id`. Unknown pairs are ignored.
    pub fn release(&mut self, name: &WorkerName, job_id: &JobId) {
        if let Some(record) = self.workers.get_mut(name) {
            record.assignments.remove(job_id);
        }
    }

    /// Jobs holding a slot on `name`, in id order.
    pub fn assignments(&self, name: &WorkerName) -> Vec<JobId> {
        self.workers
            .get(name)
            .map(|w| w.assignments.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn peer(&self, name: &WorkerName) -> Peer {
        Peer {
            name: name.clone(),
            hostname: self
                .workers
                .get(name)
                .map(|w| w.hostname.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
