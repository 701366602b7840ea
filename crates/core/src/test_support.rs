// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Capability, CapabilitySet, Event, JobId, Registration, Requirements, WorkerName};
use crate::{ResourceBudget, TimerId};
use serde_json::json;

// ── Builders ────────────────────────────────────────────────────────────────

pub fn caps(items: &[&str]) -> CapabilitySet {
    items
        .iter()
        .filter_map(|s| s.parse::<Capability>().ok())
        .collect()
}

pub fn registration(name: &str, capabilities: &[&str]) -> Registration {
    Registration {
        name: WorkerName::new(name),
        hostname: format!("{name}.test"),
        capabilities: caps(capabilities),
        budget: ResourceBudget::default(),
        slots: None,
    }
}

// ── Event factory functions ─────────────────────────────────────────────────

pub fn register_event(name: &str, capabilities: &[&str]) -> Event {
    Event::WorkerRegister {
        registration: registration(name, capabilities),
    }
}

pub fn register_with_slots_event(name: &str, capabilities: &[&str], slots: u32) -> Event {
    let mut registration = registration(name, capabilities);
    registration.slots = Some(slots);
    Event::WorkerRegister { registration }
}

pub fn heartbeat_event(name: &str) -> Event {
    Event::WorkerHeartbeat {
        name: WorkerName::new(name),
    }
}

pub fn lost_event(name: &str) -> Event {
    Event::WorkerLost {
        name: WorkerName::new(name),
        reason: "test".to_string(),
    }
}

pub fn submit_event(id: &str, capabilities: &[&str], degree: u32) -> Event {
    Event::JobSubmit {
        id: JobId::new(id),
        requirements: Requirements::new(caps(capabilities)).with_degree(degree),
        payload: json!({ "job": id }),
    }
}

pub fn reassignable_submit_event(id: &str, capabilities: &[&str], degree: u32) -> Event {
    Event::JobSubmit {
        id: JobId::new(id),
        requirements: Requirements::new(caps(capabilities))
            .with_degree(degree)
            .reassignable(true),
        payload: json!({ "job": id }),
    }
}

pub fn finished_event(id: &str, worker: &str) -> Event {
    Event::JobFinished {
        id: JobId::new(id),
        worker: WorkerName::new(worker),
        result: json!({ "worker": worker }),
    }
}

pub fn failed_event(id: &str, worker: &str, cause: &str) -> Event {
    Event::JobFailed {
        id: JobId::new(id),
        worker: WorkerName::new(worker),
        cause: cause.to_string(),
    }
}

pub fn cancel_ack_event(id: &str, worker: &str) -> Event {
    Event::JobCancelAck {
        id: JobId::new(id),
        worker: WorkerName::new(worker),
    }
}

pub fn cancel_event(id: &str) -> Event {
    Event::JobCancel { id: JobId::new(id) }
}

pub fn collect_event(id: &str) -> Event {
    Event::JobCollect { id: JobId::new(id) }
}

pub fn timer_event(id: TimerId) -> Event {
    Event::TimerFired { id }
}
