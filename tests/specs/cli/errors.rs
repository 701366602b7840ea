//! Error reporting for bad input and unknown jobs

use crate::prelude::*;

#[test]
fn malformed_capability_is_rejected_before_connecting() {
    let cluster = Cluster::new();
    cluster
        .drts()
        .args(&["submit", "--capability", "gpu="])
        .fails()
        .stderr_has("invalid capability 'gpu='");
}

#[test]
fn query_without_daemon_reports_not_running() {
    let cluster = Cluster::new();
    cluster
        .drts()
        .args(&["status", "job-1"])
        .fails()
        .stderr_has("Daemon not running");
}

#[test]
fn status_of_unknown_job_fails() {
    let cluster = Cluster::new();
    cluster.drts().args(&["daemon", "start"]).passes();

    cluster
        .drts()
        .args(&["status", "nope"])
        .fails()
        .stderr_has("Error: unknown job: nope");
}

#[test]
fn zero_degree_is_rejected_by_the_daemon() {
    let cluster = Cluster::new();
    cluster
        .drts()
        .args(&["submit", "--id", "j0", "--degree", "0"])
        .fails()
        .stderr_has("job j0 requires degree >= 1");
}

#[test]
fn duplicate_job_id_is_rejected() {
    let cluster = Cluster::new();
    cluster.drts().args(&["submit", "--id", "dup"]).passes();
    cluster
        .drts()
        .args(&["submit", "--id", "dup"])
        .fails()
        .stderr_has("job already exists: dup");
}

#[test]
fn cleanup_of_live_job_is_refused() {
    let cluster = Cluster::new();
    cluster.drts().args(&["submit", "--id", "live"]).passes();
    cluster
        .drts()
        .args(&["cleanup", "live"])
        .fails()
        .stderr_has("job live is pending, not terminal");
}
