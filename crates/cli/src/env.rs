// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientError;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Resolve state directory: DRTS_STATE_DIR > XDG_STATE_HOME/drts > ~/.local/state/drts
pub fn state_dir() -> Result<PathBuf, ClientError> {
    if let Ok(dir) = std::env::var("DRTS_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("drts"));
    }
    let home = std::env::var("HOME").map_err(|_| ClientError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/drts"))
}

/// Read DRTS_STATE_DIR raw (for diagnostic logging)
pub fn state_dir_raw() -> Option<String> {
    std::env::var("DRTS_STATE_DIR").ok()
}

pub fn daemon_binary() -> Option<String> {
    std::env::var("DRTS_DAEMON_BINARY").ok()
}

pub fn cargo_manifest_dir() -> Option<String> {
    std::env::var("CARGO_MANIFEST_DIR").ok()
}

pub fn timeout_ipc_ms() -> Option<Duration> {
    parse_duration_ms("DRTS_TIMEOUT_IPC_MS")
}

pub fn timeout_connect_ms() -> Option<Duration> {
    parse_duration_ms("DRTS_TIMEOUT_CONNECT_MS")
}

pub fn timeout_exit_ms() -> Option<Duration> {
    parse_duration_ms("DRTS_TIMEOUT_EXIT_MS")
}

pub fn connect_poll_ms() -> Option<Duration> {
    parse_duration_ms("DRTS_CONNECT_POLL_MS")
}

pub fn hostname() -> Option<String> {
    std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty())
}
