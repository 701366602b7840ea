// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional `config.toml` in the state directory.
//!
//! ```toml
//! loss_policy = "requeue"
//! rejoin_grace_ms = 30000
//! ack_timeout_ms = 600000
//! heartbeat_timeout_ms = 15000
//! default_slots = 2
//! ```

use std::path::Path;
use std::time::Duration;

use drts_engine::{LossPolicy, RuntimeConfig};
use serde::Deserialize;

use super::LifecycleError;

/// Runtime settings as written in `config.toml`; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub loss_policy: LossPolicy,
    pub rejoin_grace_ms: Option<u64>,
    pub ack_timeout_ms: Option<u64>,
    pub heartbeat_timeout_ms: Option<u64>,
    pub default_slots: Option<u32>,
}

impl Settings {
    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let settings: Settings =
            toml::from_str(&text).map_err(|source| LifecycleError::Settings {
                path: path.to_path_buf(),
                source,
            })?;
        if settings.default_slots == Some(0) {
            return Err(LifecycleError::InvalidSettings(
                "default_slots must be at least 1".to_string(),
            ));
        }
        Ok(settings)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        let defaults = RuntimeConfig::default();
        RuntimeConfig {
            loss_policy: self.loss_policy,
            rejoin_grace: self.rejoin_grace_ms.map(Duration::from_millis),
            ack_timeout: self.ack_timeout_ms.map(Duration::from_millis),
            heartbeat_timeout: self.heartbeat_timeout_ms.map(Duration::from_millis),
            default_slots: self.default_slots.unwrap_or(defaults.default_slots),
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
