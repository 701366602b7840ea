// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use crate::registry::RegistryError;
use drts_core::JobError;
use thiserror::Error;

/// Protocol errors rejected by the runtime and returned to the caller.
///
/// A rejected event leaves the registry and the job store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
