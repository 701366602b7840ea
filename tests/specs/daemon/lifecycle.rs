//! Daemon start, status and stop

use crate::prelude::*;

#[test]
fn status_reports_not_running_before_start() {
    let cluster = Cluster::new();
    cluster
        .drts()
        .args(&["daemon", "status"])
        .passes()
        .stdout_eq("Daemon not running\n");
}

#[test]
fn start_then_status_reports_running() {
    let cluster = Cluster::new();
    cluster
        .drts()
        .args(&["daemon", "start"])
        .passes()
        .stdout_eq("Daemon started\n");

    cluster
        .drts()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running")
        .stdout_has("Jobs: 0 active")
        .stdout_has("Workers: 0 live");

    assert!(cluster.state_path().join("daemon.pid").exists());
    assert!(cluster.daemon_log().contains("--- drtsd: starting (pid: "));
}

#[test]
fn second_start_reports_already_running() {
    let cluster = Cluster::new();
    cluster.drts().args(&["daemon", "start"]).passes();
    cluster
        .drts()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon already running");
}

#[test]
fn stop_removes_runtime_files() {
    let cluster = Cluster::new();
    cluster.drts().args(&["daemon", "start"]).passes();
    cluster
        .drts()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_eq("Daemon stopped\n");

    let gone = wait_for(SPEC_WAIT_MAX_MS, || {
        !cluster.state_path().join("daemon.sock").exists()
    });
    assert!(gone, "socket left behind\n{}", cluster.daemon_log());
    assert!(!cluster.state_path().join("daemon.pid").exists());
}

#[test]
fn invalid_settings_fail_startup_with_reason() {
    let cluster = Cluster::new();
    cluster.settings("default_slots = 0\n");
    cluster
        .drts()
        .args(&["daemon", "start"])
        .fails()
        .stderr_has("default_slots must be at least 1");
}
