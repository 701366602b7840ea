// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{timeout_ipc, ClientError, DaemonClient};
use crate::client_lifecycle::log_connection_error;
use crate::daemon_process::{cleanup_stale_socket, daemon_dir, probe_socket};
use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

/// Point the state directory at a fresh temp dir for one test
fn isolated_state() -> tempfile::TempDir {
    let state_dir = tempdir().unwrap();
    std::env::set_var("DRTS_STATE_DIR", state_dir.path());
    state_dir
}

#[test]
#[serial]
fn connect_without_socket_reports_not_running() {
    let _state = isolated_state();
    assert!(matches!(
        DaemonClient::connect(),
        Err(ClientError::DaemonNotRunning)
    ));
}

#[test]
#[serial]
fn connect_does_not_delete_pid_file() {
    let _state = isolated_state();
    let dir = daemon_dir().unwrap();
    let pid_path = dir.join("daemon.pid");
    fs::write(&pid_path, "12345\n").unwrap();

    let result = DaemonClient::connect();
    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
    assert!(pid_path.exists());
}

#[test]
#[serial]
fn log_connection_error_appends_to_cli_log() {
    let state = isolated_state();

    log_connection_error(&ClientError::DaemonNotRunning);
    log_connection_error(&ClientError::DaemonStartTimeout);

    let content = fs::read_to_string(state.path().join("cli.log")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("error=Daemon not running"));
    assert!(lines[0].contains("daemon.sock"));
    assert!(lines[1].contains("Connection timeout"));
}

#[test]
#[serial]
fn stale_socket_is_removed_when_no_daemon_owns_it() {
    let state = isolated_state();
    let socket_path = state.path().join("daemon.sock");
    fs::write(&socket_path, "").unwrap();
    fs::write(state.path().join("daemon.pid"), "not-a-pid").unwrap();

    assert!(!probe_socket(&socket_path));
    cleanup_stale_socket().unwrap();

    assert!(!socket_path.exists());
    assert!(!state.path().join("daemon.pid").exists());
}

#[test]
#[serial]
fn ipc_timeout_reads_environment() {
    std::env::set_var("DRTS_TIMEOUT_IPC_MS", "250");
    assert_eq!(timeout_ipc(), Duration::from_millis(250));
    std::env::remove_var("DRTS_TIMEOUT_IPC_MS");
    assert_eq!(timeout_ipc(), Duration::from_secs(5));
}
