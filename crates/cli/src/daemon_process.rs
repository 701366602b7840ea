// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locating, spawning, and signalling the drtsd process.

use crate::client::ClientError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

const DAEMON_BINARY: &str = "drtsd";

/// Prefix of the line drtsd appends to its log before anything else.
const STARTUP_MARKER_PREFIX: &str = "--- drtsd: starting (pid: ";

/// Spawn drtsd detached from the terminal
pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    let binary = find_daemon_binary();

    Command::new(&binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {}", binary.display(), e)))
}

/// SIGTERM, then SIGKILL if the process outlives the exit timeout.
///
/// Sync so it can run before the async client is connected.
pub fn stop_daemon_sync() {
    if let Ok(Some(pid)) = read_daemon_pid() {
        let timeout = crate::client::timeout_exit();
        kill_signal("-15", pid);
        if !poll_exit_sync(pid, timeout) {
            force_kill_daemon(pid);
            poll_exit_sync(pid, timeout);
        }
    }

    if let Ok(dir) = daemon_dir() {
        cleanup_stale_pid(&dir);
    }
}

fn poll_exit_sync(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        std::thread::sleep(crate::client::poll_interval());
    }
    !process_exists(pid)
}

/// Wait for a process to exit
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(crate::client::poll_interval()).await;
    }
    false
}

/// DRTS_DAEMON_BINARY, then the workspace debug build, then a sibling of
/// the current executable, then whatever `drtsd` resolves to on PATH.
pub fn find_daemon_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return PathBuf::from(path);
    }

    let current_exe = std::env::current_exe().ok();

    // Release builds must not pick up a debug drtsd through an inherited CARGO_MANIFEST_DIR
    let is_debug_build = current_exe
        .as_ref()
        .and_then(|p| p.to_str())
        .is_some_and(|s| s.contains("target/debug"));

    if is_debug_build {
        let dev_path = crate::env::cargo_manifest_dir().and_then(|dir| {
            PathBuf::from(dir)
                .parent()
                .and_then(|p| p.parent())
                .map(|p| p.join("target/debug").join(DAEMON_BINARY))
        });
        if let Some(path) = dev_path.filter(|p| p.exists()) {
            return path;
        }
    }

    if let Some(sibling) = current_exe
        .as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join(DAEMON_BINARY))
        .filter(|p| p.exists())
    {
        return sibling;
    }

    PathBuf::from(DAEMON_BINARY)
}

pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    Ok(daemon_dir()?.join("daemon.sock"))
}

pub fn daemon_dir() -> Result<PathBuf, ClientError> {
    crate::env::state_dir()
}

/// Remove an orphaned PID file
pub fn cleanup_stale_pid(dir: &Path) {
    let pid_path = dir.join("daemon.pid");
    if pid_path.exists() {
        let _ = std::fs::remove_file(&pid_path);
    }
}

/// PID recorded by the running daemon, if any
pub fn read_daemon_pid() -> Result<Option<u32>, ClientError> {
    let pid_path = daemon_dir()?.join("daemon.pid");
    Ok(std::fs::read_to_string(pid_path)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok()))
}

fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn process_exists(pid: u32) -> bool {
    kill_signal("-0", pid)
}

pub fn force_kill_daemon(pid: u32) -> bool {
    kill_signal("-9", pid)
}

/// Errors logged since the most recent startup marker
pub fn read_startup_error() -> Option<String> {
    let log_path = daemon_dir().ok()?.join("daemon.log");
    let content = std::fs::read_to_string(log_path).ok()?;
    parse_startup_error(&content)
}

fn parse_startup_error(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;

    let errors: Vec<&str> = content[start_pos..]
        .lines()
        .filter(|line| line.contains("ERROR") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    let messages: Vec<&str> = errors
        .iter()
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg))
        .collect();

    if messages.is_empty() {
        Some(errors.join("\n"))
    } else {
        Some(messages.join("\n"))
    }
}

/// Replace a connection error with the daemon's own startup error when one was logged
pub fn wrap_with_startup_error(err: ClientError) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error() {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

/// Whether the socket is accepting connections
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

/// Remove socket and PID files left behind by a dead daemon
pub fn cleanup_stale_socket() -> Result<(), ClientError> {
    let dir = daemon_dir()?;
    let socket_path = dir.join("daemon.sock");
    let pid_path = dir.join("daemon.pid");

    let alive = read_daemon_pid()?.is_some_and(process_exists);
    if !alive {
        let _ = std::fs::remove_file(&socket_path);
        let _ = std::fs::remove_file(&pid_path);
    }

    Ok(())
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
