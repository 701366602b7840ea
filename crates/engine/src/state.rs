// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State owned by one agent

use crate::registry::WorkerRegistry;
use crate::store::JobStore;

/// The registry and the job store, mutated only by the runtime's dispatcher.
#[derive(Debug, Default)]
pub struct AgentState {
    pub registry: WorkerRegistry,
    pub store: JobStore,
}

impl AgentState {
    pub fn new(default_slots: u32) -> Self {
        Self {
            registry: WorkerRegistry::new(default_slots),
            store: JobStore::new(),
        }
    }
}
