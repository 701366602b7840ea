//! Submit, inspect, cancel and collect jobs without workers

use crate::prelude::*;

#[test]
fn submit_prints_the_job_id() {
    let cluster = Cluster::new();
    cluster
        .drts()
        .args(&["submit", "--id", "job-1", "--capability", "gpu"])
        .passes()
        .stdout_eq("job-1\n");
}

#[test]
fn job_without_eligible_workers_stays_pending() {
    let cluster = Cluster::new();
    cluster
        .drts()
        .args(&["submit", "--id", "job-1", "--degree", "2"])
        .passes();

    cluster
        .drts()
        .args(&["status", "job-1"])
        .passes()
        .stdout_eq("Job: job-1\nState: pending\nDegree: 2\n");
}

#[test]
fn generated_ids_are_listed() {
    let cluster = Cluster::new();
    let id = cluster.drts().args(&["submit"]).passes().stdout();
    let id = id.trim();
    assert!(!id.is_empty());

    cluster
        .drts()
        .args(&["jobs"])
        .passes()
        .stdout_has(id)
        .stdout_has("pending");
}

#[test]
fn cancel_pending_job_then_cleanup() {
    let cluster = Cluster::new();
    cluster.drts().args(&["submit", "--id", "job-1"]).passes();

    cluster
        .drts()
        .args(&["cancel", "job-1"])
        .passes()
        .stdout_eq("Cancel requested for job-1\n");
    assert_eq!(cluster.job_state("job-1"), "canceled");

    cluster
        .drts()
        .args(&["cleanup", "job-1"])
        .passes()
        .stdout_eq("Collected job-1 (canceled)\n");

    cluster
        .drts()
        .args(&["status", "job-1"])
        .fails()
        .stderr_has("unknown job: job-1");
}

#[test]
fn wait_times_out_on_pending_job() {
    let cluster = Cluster::new();
    cluster.drts().args(&["submit", "--id", "job-1"]).passes();

    cluster
        .drts()
        .args(&["wait", "job-1", "--timeout-ms", "100"])
        .fails()
        .stderr_has("timed out waiting for job job-1");
}
