// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the drts scheduling agent

mod handlers;

use crate::{coordinator, executor::Executor, planner, scheduler::Scheduler, state::AgentState};
use drts_adapters::WorkerAdapter;
use drts_core::{Clock, Effect, Event, Job, JobId, JobUpdate, WorkerRecord};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Capacity of the job update channel. Slow subscribers skip updates.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// What happens to a RUNNING job when one of its workers is lost for good.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossPolicy {
    /// The job fails with the loss as its cause.
    #[default]
    Fail,
    /// The job returns to PENDING and is placed again.
    Requeue,
}

/// Scheduling policy knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub loss_policy: LossPolicy,
    /// How long a lost worker's jobs wait for it to register again.
    /// `None` applies the loss policy immediately.
    pub rejoin_grace: Option<Duration>,
    /// Limit on how long a job may stay RUNNING or CANCELING.
    pub ack_timeout: Option<Duration>,
    /// Silence after which a worker is considered lost.
    pub heartbeat_timeout: Option<Duration>,
    /// Slot bound for registrations that do not state one.
    pub default_slots: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            loss_policy: LossPolicy::Fail,
            rejoin_grace: None,
            ack_timeout: None,
            heartbeat_timeout: None,
            default_slots: 1,
        }
    }
}

/// Runtime adapter dependencies
pub struct RuntimeDeps<W> {
    pub workers: W,
    pub state: Arc<Mutex<AgentState>>,
}

/// Runtime that serializes every state mutation of one agent
pub struct Runtime<W, C: Clock> {
    pub(crate) executor: Executor<W, C>,
    pub(crate) state: Arc<Mutex<AgentState>>,
    pub(crate) config: RuntimeConfig,
}

impl<W, C> Runtime<W, C>
where
    W: WorkerAdapter,
    C: Clock,
{
    pub fn new(deps: RuntimeDeps<W>, clock: C, config: RuntimeConfig) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            executor: Executor::new(
                deps.workers,
                Arc::new(Mutex::new(Scheduler::new())),
                clock,
                updates,
            ),
            state: deps.state,
            config,
        }
    }

    pub fn clock(&self) -> &C {
        self.executor.clock()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Get a shared reference to the scheduler (for timer checking in the daemon loop)
    pub fn scheduler(&self) -> Arc<Mutex<Scheduler>> {
        self.executor.scheduler()
    }

    /// Receive every job state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.executor.subscribe()
    }

    pub fn job(&self, id: &JobId) -> Option<Job> {
        self.state.lock().store.get(id).cloned()
    }

    /// All jobs in submission order
    pub fn jobs(&self) -> Vec<Job> {
        self.state.lock().store.jobs().cloned().collect()
    }

    /// All known workers, including lost ones, by name
    pub fn workers(&self) -> Vec<WorkerRecord> {
        self.state.lock().registry.workers().cloned().collect()
    }

    /// Run `f` against the agent state, then place whatever became placeable.
    ///
    /// The lock is released before any effect runs. An error from `f` skips
    /// planning; `f` must not have mutated state in that case.
    pub(crate) fn mutate<F>(&self, f: F) -> Result<Vec<Effect>, crate::RuntimeError>
    where
        F: FnOnce(&mut AgentState, &RuntimeConfig, u64) -> Result<Vec<Effect>, crate::RuntimeError>,
    {
        let now_ms = self.clock().epoch_ms();
        let mut state = self.state.lock();
        let mut effects = f(&mut *state, &self.config, now_ms)?;
        effects.extend(self.place(&mut *state));
        Ok(effects)
    }

    /// Reserve workers for every PENDING job that can be placed.
    fn place(&self, state: &mut AgentState) -> Vec<Effect> {
        let mut effects = Vec::new();
        let AgentState { registry, store } = state;
        for placement in planner::plan(registry, store) {
            let job_id = placement.job_id.clone();
            match coordinator::reserve(registry, store, placement, self.config.ack_timeout) {
                Ok(reserved) => {
                    tracing::info!(%job_id, "job running");
                    effects.extend(reserved);
                }
                Err(e) => tracing::debug!(%job_id, error = %e, "reservation aborted"),
            }
        }
        effects
    }

    pub(crate) async fn run(&self, effects: Vec<Effect>) -> Vec<Event> {
        self.executor.execute_all(effects).await
    }
}

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;
