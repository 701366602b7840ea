// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drts-core: shared types for the drts scheduling agent

pub mod capability;
pub mod clock;
pub mod effect;
pub mod event;
pub mod id;
pub mod job;
pub mod timer;
pub mod traced;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use capability::{Capability, CapabilitySet, ParseCapabilityError};
pub use clock::{Clock, FakeClock, SystemClock};
pub use effect::{Effect, Peer};
pub use event::Event;
pub use id::{IdGen, UuidIdGen};
pub use job::{
    Job, JobError, JobId, JobOutcome, JobState, JobTransition, JobUpdate, Requirements, Settled,
    WorkerAck,
};
pub use timer::{TimerId, TimerKind};
pub use traced::TracedEffect;
pub use worker::{Registration, ResourceBudget, WorkerName, WorkerRecord, WorkerStatus};
