//! Jobs placed on live workers

use crate::prelude::*;

#[test]
fn single_worker_job_finishes() {
    let mut cluster = Cluster::new();
    cluster.drts().args(&["daemon", "start"]).passes();
    cluster.worker(&["--name", "w1", "--capability", "gpu=a100"]);

    cluster
        .drts()
        .args(&["submit", "--id", "job-1", "--capability", "gpu=a100"])
        .passes();

    cluster
        .drts()
        .args(&["wait", "job-1", "--timeout-ms", "2000"])
        .passes()
        .stdout_has("State: finished")
        .stdout_has("Workers: w1");
}

#[test]
fn coallocated_job_waits_for_every_worker() {
    let mut cluster = Cluster::new();
    cluster.drts().args(&["daemon", "start"]).passes();
    cluster.worker(&["--name", "w1"]);
    cluster.worker(&["--name", "w2"]);

    cluster
        .drts()
        .args(&["submit", "--id", "job-2", "--degree", "2"])
        .passes();

    let output = cluster
        .drts()
        .args(&["wait", "job-2", "--timeout-ms", "2000", "-o", "json"])
        .passes()
        .stdout();
    let job: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(job["state"], "finished");
    assert_eq!(job["assigned"], serde_json::json!(["w1", "w2"]));
}

#[test]
fn failing_worker_fails_the_job() {
    let mut cluster = Cluster::new();
    cluster.drts().args(&["daemon", "start"]).passes();
    cluster.worker(&["--name", "w1", "--fail"]);

    cluster.drts().args(&["submit", "--id", "job-3"]).passes();

    cluster
        .drts()
        .args(&["wait", "job-3", "--timeout-ms", "2000"])
        .fails()
        .stdout_has("State: failed")
        .stdout_has("Cause: w1 refused the job")
        .stderr_has("job job-3 failed");
}

#[test]
fn workers_listing_shows_load_and_capabilities() {
    let mut cluster = Cluster::new();
    cluster.drts().args(&["daemon", "start"]).passes();
    cluster.worker(&["--name", "w1", "--capability", "linux", "--slots", "2"]);

    cluster
        .drts()
        .args(&["workers"])
        .passes()
        .stdout_has("NAME")
        .stdout_has("w1")
        .stdout_has("registered")
        .stdout_has("0/2")
        .stdout_has("linux");
}
