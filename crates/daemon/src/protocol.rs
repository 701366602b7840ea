// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between the daemon, its clients and its workers.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.
//!
//! A connection opened with [`Request::Register`] becomes a worker session:
//! the daemon pushes [`ServerMessage`] frames and the worker answers with
//! [`WorkerMessage`] frames until either side closes. Every other request is
//! answered with a single [`Response`].

use drts_adapters::Assignment;
use drts_core::{Job, JobId, JobState, Registration, Requirements, WorkerRecord};
use serde::{Deserialize, Serialize};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_frame, read_message, read_request, write_frame, write_response,
    ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

/// Request from a client (or a worker opening its session)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Submit a job. The daemon picks an id when none is given.
    Submit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        requirements: Requirements,
        #[serde(default)]
        payload: serde_json::Value,
    },

    /// Current record of one job
    Status { id: String },

    /// Block until the job is terminal
    Wait {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Request cancellation
    Cancel { id: String },

    /// Collect a terminal job and free it
    Cleanup { id: String },

    /// All jobs in submission order
    ListJobs,

    /// All known workers
    ListWorkers,

    /// Daemon uptime and counters
    Info,

    /// Request daemon shutdown
    Shutdown,

    /// Open a worker session on this connection
    Register { registration: Registration },
}

/// Response from daemon to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    /// Job accepted in PENDING
    Submitted { id: String },

    /// Full job record
    Job { job: Box<Job> },

    /// Job listing
    Jobs { jobs: Vec<JobSummary> },

    /// Worker listing
    Workers { workers: Vec<WorkerSummary> },

    /// Daemon status
    Info {
        uptime_secs: u64,
        jobs_active: usize,
        workers_live: usize,
    },

    /// Worker session is open
    Registered,

    /// Error response
    Error { message: String },
}

/// Frames a registered worker sends over its session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    Heartbeat,
    Finished {
        job_id: JobId,
        #[serde(default)]
        result: serde_json::Value,
    },
    Failed {
        job_id: JobId,
        cause: String,
    },
    CancelAck {
        job_id: JobId,
    },
}

/// Frames the daemon pushes to a registered worker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Start work on a job as one member of its coallocated set
    Dispatch { assignment: Assignment },

    /// Stop work on a job and answer with any ack
    Cancel { job_id: JobId },

    /// A message from this worker was refused; nothing changed
    Rejected { message: String },
}

/// One line of `drts jobs`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSummary {
    pub id: String,
    pub state: JobState,
    pub degree: u32,
    pub assigned: Vec<String>,
    pub attempts: u32,
    pub submitted_at_ms: u64,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            state: job.state,
            degree: job.degree(),
            assigned: job.assigned.iter().map(|w| w.to_string()).collect(),
            attempts: job.attempts,
            submitted_at_ms: job.submitted_at_ms,
        }
    }
}

/// One line of `drts workers`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerSummary {
    pub name: String,
    pub hostname: String,
    /// `registered`, `busy(n)` or `lost`
    pub status: String,
    pub load: usize,
    pub slots: u32,
    pub capabilities: String,
}

impl From<&WorkerRecord> for WorkerSummary {
    fn from(worker: &WorkerRecord) -> Self {
        Self {
            name: worker.name.to_string(),
            hostname: worker.hostname.clone(),
            status: worker.status().to_string(),
            load: worker.load(),
            slots: worker.slots,
            capabilities: worker.capabilities.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
