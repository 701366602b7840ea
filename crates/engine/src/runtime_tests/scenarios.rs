// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scheduling scenarios

use super::*;
use drts_core::JobOutcome;

#[tokio::test]
async fn single_worker_job_runs_to_finished() {
    let ctx = setup();
    ctx.send(register_event("w1", &["gpu"])).await;
    ctx.send(submit_event("j1", &["gpu"], 1)).await;

    assert_eq!(ctx.state("j1"), JobState::Running);
    assert_eq!(ctx.dispatched("j1"), vec!["w1"]);
    assert_eq!(ctx.worker_status("w1"), busy(&["j1"]));

    ctx.send(finished_event("j1", "w1")).await;

    let job = ctx.job("j1");
    assert_eq!(job.state, JobState::Finished);
    assert_eq!(
        job.history,
        vec![JobState::Pending, JobState::Running, JobState::Finished]
    );
    let Some(JobOutcome::Finished { results }) = job.outcome else {
        panic!("expected finished outcome");
    };
    assert_eq!(results[&name("w1")], serde_json::json!({ "worker": "w1" }));
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Registered);
}

#[tokio::test]
async fn coallocated_job_waits_for_every_worker() {
    let ctx = setup();
    ctx.send(submit_event("j1", &[], 2)).await;

    ctx.send(register_event("w1", &[])).await;
    assert_eq!(ctx.state("j1"), JobState::Pending);
    assert!(ctx.dispatched("j1").is_empty());
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Registered);

    ctx.send(register_event("w2", &[])).await;
    assert_eq!(ctx.state("j1"), JobState::Running);
    assert_eq!(ctx.dispatched("j1"), vec!["w1", "w2"]);

    ctx.send(finished_event("j1", "w1")).await;
    assert_eq!(ctx.state("j1"), JobState::Running);
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Registered);

    ctx.send(finished_event("j1", "w2")).await;
    assert_eq!(ctx.state("j1"), JobState::Finished);
}

#[tokio::test]
async fn dispatch_carries_rank_and_peer_list() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 2)).await;

    let dispatches = ctx.workers.dispatches(&JobId::new("j1"));
    assert_eq!(dispatches.len(), 2);
    for (expected_rank, (worker, assignment)) in dispatches.iter().enumerate() {
        assert_eq!(assignment.rank as usize, expected_rank);
        assert_eq!(assignment.peers[expected_rank].name, *worker);
        let hosts: Vec<&str> = assignment.peers.iter().map(|p| p.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["w1.test", "w2.test"]);
        assert_eq!(assignment.payload, serde_json::json!({ "job": "j1" }));
    }
}

#[tokio::test]
async fn job_stays_pending_until_enough_eligible_workers() {
    let ctx = setup();
    ctx.send(register_event("w1", &["mpi"])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &["mpi"], 2)).await;
    assert_eq!(ctx.state("j1"), JobState::Pending);

    ctx.send(register_event("w3", &["mpi", "gpu"])).await;
    assert_eq!(ctx.state("j1"), JobState::Running);
    assert_eq!(ctx.dispatched("j1"), vec!["w1", "w3"]);
}

#[tokio::test]
async fn failure_ack_fails_job_and_drains_peers() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 2)).await;

    ctx.send(failed_event("j1", "w1", "segfault")).await;

    let job = ctx.job("j1");
    assert_eq!(job.state, JobState::Failed);
    assert!(matches!(
        job.outcome,
        Some(JobOutcome::Failed { ref cause, .. }) if cause == "segfault"
    ));
    assert_eq!(ctx.cancelled("j1"), vec!["w2"]);
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Registered);
    assert_eq!(ctx.worker_status("w2"), busy(&["j1"]));

    // The drained worker's late answer frees its slot.
    ctx.send(finished_event("j1", "w2")).await;
    assert_eq!(ctx.worker_status("w2"), WorkerStatus::Registered);
    assert_eq!(ctx.state("j1"), JobState::Failed);
}

#[tokio::test]
async fn slots_allow_concurrent_jobs_on_one_worker() {
    let ctx = setup();
    ctx.send(register_with_slots_event("w1", &[], 2)).await;
    for id in ["j1", "j2", "j3"] {
        ctx.send(submit_event(id, &[], 1)).await;
    }

    assert_eq!(ctx.state("j1"), JobState::Running);
    assert_eq!(ctx.state("j2"), JobState::Running);
    assert_eq!(ctx.state("j3"), JobState::Pending);
    assert_eq!(ctx.worker_status("w1"), busy(&["j1", "j2"]));

    ctx.send(finished_event("j1", "w1")).await;
    assert_eq!(ctx.state("j3"), JobState::Running);
}

#[tokio::test]
async fn least_loaded_worker_is_preferred() {
    let ctx = setup_with(RuntimeConfig {
        default_slots: 2,
        ..RuntimeConfig::default()
    });
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j2", &[], 1)).await;

    assert_eq!(ctx.dispatched("j1"), vec!["w1"]);
    assert_eq!(ctx.dispatched("j2"), vec!["w2"]);
}

#[tokio::test]
async fn collect_frees_terminal_job() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(finished_event("j1", "w1")).await;

    let (job, _) = ctx.runtime.collect(&JobId::new("j1")).await.unwrap();
    assert_eq!(job.state, JobState::Finished);
    assert!(ctx.runtime.job(&JobId::new("j1")).is_none());
    assert!(ctx.runtime.jobs().is_empty());
}

#[tokio::test]
async fn collect_releases_draining_slots_and_replans() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 2)).await;
    ctx.send(failed_event("j1", "w1", "boom")).await;
    ctx.send(submit_event("j2", &[], 2)).await;
    assert_eq!(ctx.state("j2"), JobState::Pending);

    ctx.send(collect_event("j1")).await;
    assert_eq!(ctx.state("j2"), JobState::Running);
    assert_eq!(ctx.worker_status("w2"), busy(&["j2"]));
}
