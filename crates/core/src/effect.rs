// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects represent side effects the agent needs to perform

use crate::event::Event;
use crate::job::{JobId, JobUpdate};
use crate::timer::TimerId;
use crate::worker::WorkerName;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A member of a coallocated worker set, as told to each participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub name: WorkerName,
    pub hostname: String,
}

/// Effects that need to be executed by the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Feed an event back into the dispatcher
    Emit { event: Event },

    /// Send a job's payload to one of its assigned workers
    Dispatch {
        job_id: JobId,
        worker: WorkerName,
        /// Position of `worker` within `peers`
        rank: u32,
        peers: Vec<Peer>,
        payload: serde_json::Value,
    },

    /// Tell a worker to stop its share of a job
    Cancel { job_id: JobId, worker: WorkerName },

    SetTimer {
        id: TimerId,
        #[serde(with = "duration_serde")]
        duration: Duration,
    },

    CancelTimer { id: TimerId },

    /// Announce a job state change to waiting clients
    Publish { update: JobUpdate },
}

impl crate::traced::TracedEffect for Effect {
    fn name(&self) -> &'static str {
        match self {
            Effect::Emit { .. } => "emit",
            Effect::Dispatch { .. } => "dispatch",
            Effect::Cancel { .. } => "cancel",
            Effect::SetTimer { .. } => "set_timer",
            Effect::CancelTimer { .. } => "cancel_timer",
            Effect::Publish { .. } => "publish",
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::Emit { event } => vec![("event", event.log_summary())],
            Effect::Dispatch {
                job_id,
                worker,
                rank,
                peers,
                ..
            } => vec![
                ("job_id", job_id.to_string()),
                ("worker", worker.to_string()),
                ("rank", rank.to_string()),
                ("peers", peers.len().to_string()),
            ],
            Effect::Cancel { job_id, worker } => vec![
                ("job_id", job_id.to_string()),
                ("worker", worker.to_string()),
            ],
            Effect::SetTimer { id, duration } => vec![
                ("timer_id", id.to_string()),
                ("duration_ms", duration.as_millis().to_string()),
            ],
            Effect::CancelTimer { id } => vec![("timer_id", id.to_string())],
            Effect::Publish { update } => vec![
                ("job_id", update.id.to_string()),
                ("state", update.state.to_string()),
            ],
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
