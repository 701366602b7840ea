// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer bookkeeping for the runtime
//!
//! The scheduler only records deadlines. The daemon polls it and feeds
//! `timer:fired` events back through the dispatcher.

use drts_core::{Event, TimerId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Pending timers keyed by id. Setting an existing id replaces its deadline.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<TimerId, Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timer(&mut self, id: TimerId, duration: Duration, now: Instant) {
        self.timers.insert(id, now + duration);
    }

    pub fn cancel_timer(&mut self, id: &TimerId) {
        self.timers.remove(id);
    }

    pub fn is_set(&self, id: &TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Remove and return every expired timer, earliest deadline first.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<Event> {
        let mut expired: Vec<(Instant, TimerId)> = self
            .timers
            .iter()
            .filter(|(_, fires_at)| **fires_at <= now)
            .map(|(id, fires_at)| (*fires_at, id.clone()))
            .collect();
        expired.sort();

        expired
            .into_iter()
            .map(|(_, id)| {
                self.timers.remove(&id);
                Event::TimerFired { id }
            })
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().copied()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
