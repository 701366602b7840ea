// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job records and the job state machine.
//!
//! ```text
//! PENDING ──reserve──▶ RUNNING ──all finished──▶ FINISHED
//!    │                  │  │
//!    │                  │  └──failed ack / loss / ack timeout──▶ FAILED
//!    │                  │  └──loss (re-assignable)──▶ PENDING
//!    │                  └──cancel──▶ CANCELING ──all acked──▶ CANCELED
//!    │                                   └──loss / ack timeout──▶ FAILED
//!    └──cancel──▶ CANCELED
//! ```
//!
//! [`Job::apply`] is the only way a job changes state. It never touches the
//! worker registry; instead it reports which workers must be released and
//! which must be told to stop via [`Settled`].

use crate::capability::CapabilitySet;
use crate::worker::WorkerName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

crate::define_id! {
    /// Opaque unique identifier for a submitted job.
    #[derive(Default)]
    pub struct JobId;
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Canceling,
    Finished,
    Failed,
    Canceled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Failed | JobState::Canceled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Canceling => "canceling",
            JobState::Finished => "finished",
            JobState::Failed => "failed",
            JobState::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

fn default_degree() -> u32 {
    1
}

/// What a job needs from the worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub capabilities: CapabilitySet,
    /// Number of workers that must run the job simultaneously.
    #[serde(default = "default_degree")]
    pub degree: u32,
    /// Return to PENDING instead of failing when an assigned worker is lost.
    #[serde(default)]
    pub reassignable: bool,
}

impl Requirements {
    pub fn new(capabilities: CapabilitySet) -> Self {
        Self {
            capabilities,
            degree: 1,
            reassignable: false,
        }
    }

    pub fn with_degree(mut self, degree: u32) -> Self {
        self.degree = degree;
        self
    }

    pub fn reassignable(mut self, reassignable: bool) -> Self {
        self.reassignable = reassignable;
        self
    }
}

impl Default for Requirements {
    fn default() -> Self {
        Self::new(CapabilitySet::new())
    }
}

/// A worker's answer for its share of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ack", rename_all = "snake_case")]
pub enum WorkerAck {
    Finished {
        #[serde(default)]
        result: serde_json::Value,
    },
    Failed {
        cause: String,
    },
    /// Acknowledges a cancel instruction.
    Canceled,
}

impl WorkerAck {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerAck::Finished { .. } => "finished",
            WorkerAck::Failed { .. } => "failed",
            WorkerAck::Canceled => "cancel-ack",
        }
    }
}

/// Payload attached when a job enters a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Per-worker results, keyed by worker name.
    Finished {
        results: BTreeMap<WorkerName, serde_json::Value>,
    },
    Failed {
        cause: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker: Option<WorkerName>,
    },
    Canceled,
}

/// Input to the job state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTransition {
    /// A worker set of exactly `degree` members was reserved.
    Reserve { workers: Vec<WorkerName> },
    /// An assigned (or draining) worker answered.
    Ack { worker: WorkerName, ack: WorkerAck },
    /// A client asked for cancellation.
    Cancel,
    /// An assigned worker is gone for good. `requeue` selects the
    /// re-assignable policy.
    WorkerLost { worker: WorkerName, requeue: bool },
    /// Acknowledgements did not arrive in time.
    AckTimeout,
}

impl JobTransition {
    pub fn name(&self) -> &'static str {
        match self {
            JobTransition::Reserve { .. } => "reserve",
            JobTransition::Ack { ack, .. } => ack.name(),
            JobTransition::Cancel => "cancel",
            JobTransition::WorkerLost { .. } => "worker-lost",
            JobTransition::AckTimeout => "ack-timeout",
        }
    }
}

/// Worker-side consequences of a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settled {
    /// Workers whose slot for this job is now free.
    pub released: Vec<WorkerName>,
    /// Workers that must be told to stop. Their slot stays held (draining)
    /// until they answer.
    pub to_cancel: Vec<WorkerName>,
}

/// Errors from the job store and the job state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("unknown job: {0}")]
    Unknown(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("job {id} is {state}, not terminal")]
    NotTerminal { id: JobId, state: JobState },
    #[error("job {id} is {state}: {transition} is not a valid transition")]
    InvalidTransition {
        id: JobId,
        state: JobState,
        transition: &'static str,
    },
    #[error("job {id} needs {expected} workers, reservation has {actual}")]
    DegreeMismatch {
        id: JobId,
        expected: u32,
        actual: usize,
    },
    #[error("worker {worker} already holds a slot for job {id}")]
    DuplicateWorker { id: JobId, worker: WorkerName },
    #[error("worker {worker} is not assigned to job {id}")]
    NotAssigned { id: JobId, worker: WorkerName },
    #[error("worker {worker} already answered job {id} with {previous}, got {received}")]
    ConflictingAck {
        id: JobId,
        worker: WorkerName,
        previous: &'static str,
        received: &'static str,
    },
    #[error("job {id} requires degree >= 1")]
    InvalidDegree { id: JobId },
}

/// A job record, owned by the job store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub requirements: Requirements,
    /// Opaque payload handed to every assigned worker.
    #[serde(default)]
    pub payload: serde_json::Value,
    pub state: JobState,
    /// Ordered worker set: empty, or exactly `degree` members.
    #[serde(default)]
    pub assigned: Vec<WorkerName>,
    #[serde(default)]
    pub acks: BTreeMap<WorkerName, WorkerAck>,
    /// Workers sent a cancel whose slot is held until they answer.
    #[serde(default)]
    pub draining: BTreeSet<WorkerName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
    /// Every state the job has been in, starting with PENDING.
    pub history: Vec<JobState>,
    /// Number of reservations made for this job.
    #[serde(default)]
    pub attempts: u32,
    pub submitted_at_ms: u64,
}

impl Job {
    pub fn new(
        id: JobId,
        requirements: Requirements,
        payload: serde_json::Value,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            requirements,
            payload,
            state: JobState::Pending,
            assigned: Vec::new(),
            acks: BTreeMap::new(),
            draining: BTreeSet::new(),
            outcome: None,
            history: vec![JobState::Pending],
            attempts: 0,
            submitted_at_ms: now_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn degree(&self) -> u32 {
        self.requirements.degree
    }

    /// Assigned workers that have not answered yet.
    pub fn outstanding(&self) -> Vec<WorkerName> {
        self.assigned
            .iter()
            .filter(|w| !self.acks.contains_key(*w))
            .cloned()
            .collect()
    }

    /// Whether `worker` holds a slot for this job (assigned and unanswered, or draining).
    pub fn holds(&self, worker: &WorkerName) -> bool {
        self.draining.contains(worker)
            || (self.assigned.contains(worker) && !self.acks.contains_key(worker))
    }

    /// Apply a transition, returning the worker-side consequences.
    pub fn apply(&mut self, transition: JobTransition) -> Result<Settled, JobError> {
        let name = transition.name();
        match transition {
            JobTransition::Reserve { workers } => self.reserve(workers),
            JobTransition::Ack { worker, ack } => self.ack(worker, ack),
            JobTransition::Cancel => self.cancel(),
            JobTransition::WorkerLost { worker, requeue } => self.lose(worker, requeue, name),
            JobTransition::AckTimeout => match self.state {
                JobState::Running | JobState::Canceling => {
                    Ok(self.fail("acknowledgement timeout".to_string(), None))
                }
                _ => Err(self.invalid(name)),
            },
        }
    }

    fn reserve(&mut self, workers: Vec<WorkerName>) -> Result<Settled, JobError> {
        if self.state != JobState::Pending {
            return Err(self.invalid("reserve"));
        }
        if workers.len() != self.degree() as usize {
            return Err(JobError::DegreeMismatch {
                id: self.id.clone(),
                expected: self.degree(),
                actual: workers.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for worker in &workers {
            if !seen.insert(worker) || self.draining.contains(worker) {
                return Err(JobError::DuplicateWorker {
                    id: self.id.clone(),
                    worker: worker.clone(),
                });
            }
        }

        self.assigned = workers;
        self.acks.clear();
        self.attempts += 1;
        self.enter(JobState::Running);
        Ok(Settled::default())
    }

    fn ack(&mut self, worker: WorkerName, ack: WorkerAck) -> Result<Settled, JobError> {
        // Draining workers may answer in any state, including terminal ones.
        if self.draining.remove(&worker) {
            return Ok(self.drained(worker, ack));
        }
        if !self.assigned.contains(&worker) {
            return Err(JobError::NotAssigned {
                id: self.id.clone(),
                worker,
            });
        }
        if let Some(previous) = self.acks.get(&worker) {
            if *previous == ack {
                // Replayed ack, e.g. after a worker restart.
                return Ok(Settled::default());
            }
            return Err(JobError::ConflictingAck {
                id: self.id.clone(),
                worker,
                previous: previous.name(),
                received: ack.name(),
            });
        }

        match (self.state, &ack) {
            (JobState::Running, WorkerAck::Finished { .. })
            | (JobState::Running, WorkerAck::Failed { .. })
            | (JobState::Canceling, _) => {}
            _ => return Err(self.invalid(ack.name())),
        }

        let failure = match &ack {
            WorkerAck::Failed { cause } => Some(cause.clone()),
            _ => None,
        };
        self.acks.insert(worker.clone(), ack);
        let released = vec![worker.clone()];

        if self.state == JobState::Running {
            if let Some(cause) = failure {
                let mut settled = self.fail(cause, Some(worker));
                settled.released.extend(released);
                return Ok(settled);
            }
            if self.outstanding().is_empty() {
                let results = self
                    .acks
                    .iter()
                    .map(|(name, ack)| match ack {
                        WorkerAck::Finished { result } => (name.clone(), result.clone()),
                        _ => (name.clone(), serde_json::Value::Null),
                    })
                    .collect();
                self.outcome = Some(JobOutcome::Finished { results });
                self.enter(JobState::Finished);
            }
        } else if self.outstanding().is_empty() {
            self.outcome = Some(JobOutcome::Canceled);
            self.enter(JobState::Canceled);
        }

        Ok(Settled {
            released,
            to_cancel: Vec::new(),
        })
    }

    fn cancel(&mut self) -> Result<Settled, JobError> {
        match self.state {
            JobState::Pending => {
                self.outcome = Some(JobOutcome::Canceled);
                self.enter(JobState::Canceled);
                Ok(Settled::default())
            }
            JobState::Running => {
                self.enter(JobState::Canceling);
                Ok(Settled {
                    released: Vec::new(),
                    to_cancel: self.outstanding(),
                })
            }
            _ => Err(self.invalid("cancel")),
        }
    }

    fn lose(
        &mut self,
        worker: WorkerName,
        requeue: bool,
        name: &'static str,
    ) -> Result<Settled, JobError> {
        if self.draining.remove(&worker) {
            let lost = WorkerAck::Failed {
                cause: "lost".to_string(),
            };
            return Ok(self.drained(worker, lost));
        }
        if !matches!(self.state, JobState::Running | JobState::Canceling) {
            return Err(self.invalid(name));
        }
        if !self.assigned.contains(&worker) {
            return Err(JobError::NotAssigned {
                id: self.id.clone(),
                worker,
            });
        }
        if self.acks.contains_key(&worker) {
            // Its share is already answered; nothing is waiting on it.
            return Ok(Settled::default());
        }

        if requeue && self.state == JobState::Running {
            let survivors: Vec<WorkerName> = self
                .outstanding()
                .into_iter()
                .filter(|w| *w != worker)
                .collect();
            self.draining.extend(survivors.iter().cloned());
            self.assigned.clear();
            self.acks.clear();
            self.enter(JobState::Pending);
            return Ok(Settled {
                released: vec![worker],
                to_cancel: survivors,
            });
        }

        // Exclude the lost worker from draining: nobody is left to answer.
        self.acks.insert(
            worker.clone(),
            WorkerAck::Failed {
                cause: "lost".to_string(),
            },
        );
        let mut settled = self.fail(format!("worker {worker} lost"), Some(worker.clone()));
        settled.released.push(worker);
        Ok(settled)
    }

    /// Close out a draining worker. A worker still in the assigned set keeps
    /// its answer so it no longer counts as outstanding.
    fn drained(&mut self, worker: WorkerName, ack: WorkerAck) -> Settled {
        if self.assigned.contains(&worker) {
            self.acks.entry(worker.clone()).or_insert(ack);
        }
        Settled {
            released: vec![worker],
            to_cancel: Vec::new(),
        }
    }

    /// Enter FAILED and drain every outstanding worker.
    fn fail(&mut self, cause: String, worker: Option<WorkerName>) -> Settled {
        let to_cancel = self.outstanding();
        self.draining.extend(to_cancel.iter().cloned());
        self.outcome = Some(JobOutcome::Failed { cause, worker });
        self.enter(JobState::Failed);
        Settled {
            released: Vec::new(),
            to_cancel,
        }
    }

    fn enter(&mut self, state: JobState) {
        self.state = state;
        self.history.push(state);
    }

    fn invalid(&self, transition: &'static str) -> JobError {
        JobError::InvalidTransition {
            id: self.id.clone(),
            state: self.state,
            transition,
        }
    }
}

/// Published whenever a job changes state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub id: JobId,
    pub state: JobState,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
