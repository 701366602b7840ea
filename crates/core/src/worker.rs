// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identity, registration data and registry records.

use crate::capability::CapabilitySet;
use crate::job::JobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

crate::define_id! {
    /// Name a worker registers under.
    ///
    /// Unique per live process, but reusable: a restarted process may register
    /// under the name of a worker that was lost, which re-binds the old record.
    pub struct WorkerName;
}

/// Resources a worker brings to the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBudget {
    /// Shared-memory segment size allocated to the worker, in bytes.
    #[serde(default)]
    pub shm_bytes: u64,
    /// Whether the worker may spawn child sub-workers.
    #[serde(default)]
    pub spawn_allowed: bool,
}

/// Everything a worker announces when it registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: WorkerName,
    pub hostname: String,
    #[serde(default)]
    pub capabilities: CapabilitySet,
    #[serde(default)]
    pub budget: ResourceBudget,
    /// Concurrent job bound; the agent's default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<u32>,
}

/// Externally visible worker status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "jobs", rename_all = "snake_case")]
pub enum WorkerStatus {
    Registered,
    Busy(Vec<JobId>),
    Lost,
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerStatus::Registered => write!(f, "registered"),
            WorkerStatus::Busy(jobs) => write!(f, "busy({})", jobs.len()),
            WorkerStatus::Lost => write!(f, "lost"),
        }
    }
}

/// Registry record for one worker name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub name: WorkerName,
    pub hostname: String,
    pub capabilities: CapabilitySet,
    pub budget: ResourceBudget,
    pub slots: u32,
    /// Jobs currently holding a slot on this worker (reserved, running or draining).
    pub assignments: BTreeSet<JobId>,
    pub lost: bool,
    /// Incremented on every registration under this name.
    pub generation: u32,
    pub registered_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lost_at_ms: Option<u64>,
}

impl WorkerRecord {
    pub fn new(registration: Registration, default_slots: u32, now_ms: u64) -> Self {
        Self {
            name: registration.name,
            hostname: registration.hostname,
            capabilities: registration.capabilities,
            budget: registration.budget,
            slots: registration.slots.unwrap_or(default_slots).max(1),
            assignments: BTreeSet::new(),
            lost: false,
            generation: 1,
            registered_at_ms: now_ms,
            lost_at_ms: None,
        }
    }

    /// Re-bind a lost record to a freshly registered process.
    ///
    /// Assignments survive so that jobs referencing this name stay resolvable.
    pub fn rebind(&mut self, registration: Registration, default_slots: u32, now_ms: u64) {
        self.hostname = registration.hostname;
        self.capabilities = registration.capabilities;
        self.budget = registration.budget;
        self.slots = registration.slots.unwrap_or(default_slots).max(1);
        self.lost = false;
        self.generation += 1;
        self.registered_at_ms = now_ms;
        self.lost_at_ms = None;
    }

    pub fn status(&self) -> WorkerStatus {
        if self.lost {
            WorkerStatus::Lost
        } else if self.assignments.is_empty() {
            WorkerStatus::Registered
        } else {
            WorkerStatus::Busy(self.assignments.iter().cloned().collect())
        }
    }

    /// Number of jobs holding a slot.
    pub fn load(&self) -> usize {
        self.assignments.len()
    }

    pub fn has_free_slot(&self) -> bool {
        self.load() < self.slots as usize
    }

    /// Live, has a free slot, and advertises everything in `required`.
    pub fn is_eligible(&self, required: &CapabilitySet) -> bool {
        !self.lost && self.has_free_slot() && required.is_subset_of(&self.capabilities)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
