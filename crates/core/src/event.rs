// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol events consumed by the agent's dispatcher.
//!
//! Serializes with `{"type": "kind:name", ...fields}` format.

use crate::job::{JobId, Requirements, WorkerAck};
use crate::timer::TimerId;
use crate::worker::{Registration, WorkerName};
use serde::{Deserialize, Serialize};

/// Every input the agent reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- worker --
    #[serde(rename = "worker:register")]
    WorkerRegister { registration: Registration },

    #[serde(rename = "worker:heartbeat")]
    WorkerHeartbeat { name: WorkerName },

    /// Disconnect, heartbeat expiry or a failed send.
    #[serde(rename = "worker:lost")]
    WorkerLost {
        name: WorkerName,
        #[serde(default)]
        reason: String,
    },

    // -- job --
    #[serde(rename = "job:submit")]
    JobSubmit {
        id: JobId,
        requirements: Requirements,
        #[serde(default)]
        payload: serde_json::Value,
    },

    #[serde(rename = "job:finished")]
    JobFinished {
        id: JobId,
        worker: WorkerName,
        #[serde(default)]
        result: serde_json::Value,
    },

    #[serde(rename = "job:failed")]
    JobFailed {
        id: JobId,
        worker: WorkerName,
        cause: String,
    },

    #[serde(rename = "job:cancel_ack")]
    JobCancelAck { id: JobId, worker: WorkerName },

    #[serde(rename = "job:cancel")]
    JobCancel { id: JobId },

    /// Client collected the terminal record; the job is freed.
    #[serde(rename = "job:collect")]
    JobCollect { id: JobId },

    // -- timer --
    #[serde(rename = "timer:fired")]
    TimerFired { id: TimerId },

    // -- system --
    #[serde(rename = "system:shutdown")]
    Shutdown,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::WorkerRegister { .. } => "worker:register",
            Event::WorkerHeartbeat { .. } => "worker:heartbeat",
            Event::WorkerLost { .. } => "worker:lost",
            Event::JobSubmit { .. } => "job:submit",
            Event::JobFinished { .. } => "job:finished",
            Event::JobFailed { .. } => "job:failed",
            Event::JobCancelAck { .. } => "job:cancel_ack",
            Event::JobCancel { .. } => "job:cancel",
            Event::JobCollect { .. } => "job:collect",
            Event::TimerFired { .. } => "timer:fired",
            Event::Shutdown => "system:shutdown",
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::JobSubmit { id, .. }
            | Event::JobFinished { id, .. }
            | Event::JobFailed { id, .. }
            | Event::JobCancelAck { id, .. }
            | Event::JobCancel { id }
            | Event::JobCollect { id } => Some(id),
            _ => None,
        }
    }

    /// Split an acknowledgement event into its job, worker and ack.
    pub fn as_ack(&self) -> Option<(&JobId, &WorkerName, WorkerAck)> {
        match self {
            Event::JobFinished { id, worker, result } => Some((
                id,
                worker,
                WorkerAck::Finished {
                    result: result.clone(),
                },
            )),
            Event::JobFailed { id, worker, cause } => Some((
                id,
                worker,
                WorkerAck::Failed {
                    cause: cause.clone(),
                },
            )),
            Event::JobCancelAck { id, worker } => Some((id, worker, WorkerAck::Canceled)),
            _ => None,
        }
    }

    /// One-line summary for logs.
    pub fn log_summary(&self) -> String {
        let t = self.name();
        match self {
            Event::WorkerRegister { registration } => format!(
                "{t} worker={} host={} caps=[{}]",
                registration.name, registration.hostname, registration.capabilities
            ),
            Event::WorkerHeartbeat { name } => format!("{t} worker={name}"),
            Event::WorkerLost { name, reason } => format!("{t} worker={name} reason={reason}"),
            Event::JobSubmit { id, requirements, .. } => format!(
                "{t} id={id} degree={} caps=[{}]",
                requirements.degree, requirements.capabilities
            ),
            Event::JobFinished { id, worker, .. } | Event::JobCancelAck { id, worker } => {
                format!("{t} id={id} worker={worker}")
            }
            Event::JobFailed { id, worker, cause } => {
                format!("{t} id={id} worker={worker} cause={cause}")
            }
            Event::JobCancel { id } | Event::JobCollect { id } => format!("{t} id={id}"),
            Event::TimerFired { id } => format!("{t} id={id}"),
            Event::Shutdown => t.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
