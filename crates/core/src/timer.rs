// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifiers.
//!
//! The kind of timer is encoded as a prefix so that a fired timer can be
//! routed back to the job or worker it guards without extra bookkeeping.

use crate::job::JobId;
use crate::worker::WorkerName;
use serde::{Deserialize, Serialize};
use std::fmt;

const HEARTBEAT: &str = "heartbeat:";
const ACK_TIMEOUT: &str = "ack-timeout:";
const REJOIN: &str = "rejoin:";

/// Unique identifier for a scheduled timer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(pub String);

/// What a fired timer refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// No heartbeat from the worker within the timeout.
    Heartbeat(WorkerName),
    /// Job acknowledgements did not all arrive in time.
    AckTimeout(JobId),
    /// A lost worker did not come back within the grace period.
    Rejoin(WorkerName),
    Unknown,
}

impl TimerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn heartbeat(worker: &WorkerName) -> Self {
        Self::new(format!("{HEARTBEAT}{worker}"))
    }

    pub fn ack_timeout(job: &JobId) -> Self {
        Self::new(format!("{ACK_TIMEOUT}{job}"))
    }

    pub fn rejoin(worker: &WorkerName) -> Self {
        Self::new(format!("{REJOIN}{worker}"))
    }

    pub fn kind(&self) -> TimerKind {
        if let Some(rest) = self.0.strip_prefix(HEARTBEAT) {
            TimerKind::Heartbeat(WorkerName::new(rest))
        } else if let Some(rest) = self.0.strip_prefix(ACK_TIMEOUT) {
            TimerKind::AckTimeout(JobId::new(rest))
        } else if let Some(rest) = self.0.strip_prefix(REJOIN) {
            TimerKind::Rejoin(WorkerName::new(rest))
        } else {
            TimerKind::Unknown
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<&str> for TimerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
