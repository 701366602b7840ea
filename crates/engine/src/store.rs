// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store: the single source of truth for job status

use drts_core::{Job, JobError, JobId, JobState, JobTransition, Requirements, Settled};
use indexmap::IndexMap;

/// Job records in submission order.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: IndexMap<JobId, Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a PENDING job.
    pub fn submit(
        &mut self,
        id: JobId,
        requirements: Requirements,
        payload: serde_json::Value,
        now_ms: u64,
    ) -> Result<&Job, JobError> {
        if requirements.degree == 0 {
            return Err(JobError::InvalidDegree { id });
        }
        if self.jobs.contains_key(&id) {
            return Err(JobError::AlreadyExists(id));
        }
        let job = Job::new(id.clone(), requirements, payload, now_ms);
        Ok(self.jobs.entry(id).or_insert(job))
    }

    /// Apply one state-machine transition to a job.
    pub fn transition(
        &mut self,
        id: &JobId,
        transition: JobTransition,
    ) -> Result<Settled, JobError> {
        let job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobError::Unknown(id.clone()))?;
        job.apply(transition)
    }

    /// Hand out a terminal job's record and forget it.
    pub fn collect(&mut self, id: &JobId) -> Result<Job, JobError> {
        let job = self.require(id)?;
        if !job.is_terminal() {
            return Err(JobError::NotTerminal {
                id: id.clone(),
                state: job.state,
            });
        }
        self.jobs
            .shift_remove(id)
            .ok_or_else(|| JobError::Unknown(id.clone()))
    }

    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn require(&self, id: &JobId) -> Result<&Job, JobError> {
        self.get(id).ok_or_else(|| JobError::Unknown(id.clone()))
    }

    pub fn state(&self, id: &JobId) -> Option<JobState> {
        self.jobs.get(id).map(|job| job.state)
    }

    /// PENDING jobs, oldest submission first.
    pub fn pending(&self) -> impl Iterator<Item = &Job> {
        self.jobs
            .values()
            .filter(|job| job.state == JobState::Pending)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
