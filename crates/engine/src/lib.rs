// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! drts scheduling engine

pub mod coordinator;
mod error;
mod executor;
pub mod planner;
pub mod recovery;
pub mod registry;
mod runtime;
mod scheduler;
pub mod state;
pub mod store;

pub use coordinator::ReservationError;
pub use error::RuntimeError;
pub use executor::{ExecuteError, Executor};
pub use planner::Placement;
pub use registry::{Registered, RegistryError, WorkerRegistry};
pub use runtime::{LossPolicy, Runtime, RuntimeConfig, RuntimeDeps};
pub use scheduler::Scheduler;
pub use state::AgentState;
pub use store::JobStore;

