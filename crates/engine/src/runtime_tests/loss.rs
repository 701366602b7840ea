// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker loss, rejoin and requeue

use super::*;
use drts_core::JobOutcome;

fn with_grace(secs: u64) -> RuntimeConfig {
    RuntimeConfig {
        rejoin_grace: Some(Duration::from_secs(secs)),
        ..RuntimeConfig::default()
    }
}

async fn running_pair(ctx: &TestContext) {
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 2)).await;
    assert_eq!(ctx.state("j1"), JobState::Running);
}

#[tokio::test]
async fn loss_without_redundancy_fails_and_cancels_survivor() {
    let ctx = setup();
    running_pair(&ctx).await;

    ctx.send(lost_event("w1")).await;

    let job = ctx.job("j1");
    assert_eq!(job.state, JobState::Failed);
    assert!(matches!(
        job.outcome,
        Some(JobOutcome::Failed { worker: Some(ref w), .. }) if w == "w1"
    ));
    assert_eq!(ctx.cancelled("j1"), vec!["w2"]);
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Lost);

    ctx.send(cancel_ack_event("j1", "w2")).await;
    assert_eq!(ctx.worker_status("w2"), WorkerStatus::Registered);
}

#[tokio::test]
async fn rejoined_worker_resumes_and_its_ack_finishes_the_job() {
    let ctx = setup_with(with_grace(30));
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;

    ctx.send(lost_event("w1")).await;
    assert_eq!(ctx.state("j1"), JobState::Running);
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Lost);

    ctx.send(register_event("w1", &[])).await;
    assert_eq!(ctx.worker_status("w1"), busy(&["j1"]));
    // Resumed, not re-dispatched.
    assert_eq!(ctx.dispatched("j1"), vec!["w1"]);

    ctx.send(finished_event("j1", "w1")).await;
    assert_eq!(ctx.state("j1"), JobState::Finished);
    assert_eq!(ctx.runtime.jobs().len(), 1);

    // The rejoin window was closed by the registration.
    ctx.advance(Duration::from_secs(60)).await;
    assert_eq!(ctx.state("j1"), JobState::Finished);
}

#[tokio::test]
async fn rejoin_does_not_duplicate_assignment() {
    let ctx = setup_with(with_grace(30));
    running_pair(&ctx).await;

    ctx.send(lost_event("w2")).await;
    ctx.send(register_event("w2", &[])).await;

    let job = ctx.job("j1");
    assert_eq!(job.assigned, vec![name("w1"), name("w2")]);
    assert_eq!(job.attempts, 1);
    assert_eq!(ctx.runtime.jobs().len(), 1);
    assert_eq!(ctx.worker_status("w2"), busy(&["j1"]));
}

#[tokio::test]
async fn rejoin_grace_expiry_applies_loss_policy() {
    let ctx = setup_with(with_grace(30));
    running_pair(&ctx).await;

    ctx.send(lost_event("w1")).await;
    ctx.advance(Duration::from_secs(29)).await;
    assert_eq!(ctx.state("j1"), JobState::Running);

    ctx.advance(Duration::from_secs(2)).await;
    assert_eq!(ctx.state("j1"), JobState::Failed);
    assert_eq!(ctx.cancelled("j1"), vec!["w2"]);
    assert!(ctx.runtime.workers().iter().all(|w| w.name != "w1" || w.assignments.is_empty()));
}

#[tokio::test]
async fn idle_worker_loss_sets_no_rejoin_timer() {
    let ctx = setup_with(with_grace(30));
    ctx.send(register_event("w1", &[])).await;
    ctx.send(lost_event("w1")).await;

    let scheduler = ctx.runtime.scheduler();
    assert!(!scheduler.lock().is_set(&drts_core::TimerId::rejoin(&name("w1"))));
}

#[tokio::test]
async fn requeue_policy_replans_on_other_workers() {
    let ctx = setup_with(RuntimeConfig {
        loss_policy: LossPolicy::Requeue,
        ..RuntimeConfig::default()
    });
    running_pair(&ctx).await;
    ctx.send(register_event("w3", &[])).await;

    ctx.send(lost_event("w1")).await;

    // Survivor is draining, so only w3 is free: not enough for degree 2.
    assert_eq!(ctx.state("j1"), JobState::Pending);
    assert_eq!(ctx.cancelled("j1"), vec!["w2"]);
    assert!(ctx.job("j1").assigned.is_empty());

    ctx.send(cancel_ack_event("j1", "w2")).await;
    let job = ctx.job("j1");
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.assigned, vec![name("w2"), name("w3")]);
    assert_eq!(job.attempts, 2);
    assert_eq!(
        job.history,
        vec![
            JobState::Pending,
            JobState::Running,
            JobState::Pending,
            JobState::Running
        ]
    );
}

#[tokio::test]
async fn reassignable_job_requeues_under_fail_policy() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(reassignable_submit_event("j1", &[], 1)).await;
    assert_eq!(ctx.dispatched("j1"), vec!["w1"]);

    ctx.send(lost_event("w1")).await;
    assert_eq!(ctx.state("j1"), JobState::Running);
    assert_eq!(ctx.dispatched("j1"), vec!["w1", "w2"]);
}

#[tokio::test]
async fn loss_while_canceling_fails_even_when_reassignable() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(reassignable_submit_event("j1", &[], 1)).await;
    ctx.send(cancel_event("j1")).await;

    ctx.send(lost_event("w1")).await;
    assert_eq!(ctx.state("j1"), JobState::Failed);
}

#[tokio::test]
async fn failed_send_is_treated_as_worker_loss() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.workers.fail_for("w1");

    ctx.send(submit_event("j1", &[], 1)).await;

    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Lost);
    assert_eq!(ctx.state("j1"), JobState::Failed);
}

#[tokio::test]
async fn repeated_loss_is_a_no_op() {
    let ctx = setup();
    running_pair(&ctx).await;
    ctx.send(lost_event("w1")).await;
    ctx.send(lost_event("w1")).await;
    assert_eq!(ctx.cancelled("j1"), vec!["w2"]);
}

#[tokio::test]
async fn rejoined_worker_gets_missed_cancel() {
    let ctx = setup_with(with_grace(30));
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(lost_event("w1")).await;

    ctx.send(cancel_event("j1")).await;
    assert_eq!(ctx.state("j1"), JobState::Canceling);
    assert!(ctx.cancelled("j1").is_empty());

    ctx.send(register_event("w1", &[])).await;
    assert_eq!(ctx.cancelled("j1"), vec!["w1"]);

    ctx.send(cancel_ack_event("j1", "w1")).await;
    assert_eq!(ctx.state("j1"), JobState::Canceled);
}

#[tokio::test]
async fn replayed_ack_after_rejoin_is_accepted() {
    let ctx = setup_with(with_grace(30));
    running_pair(&ctx).await;

    ctx.send(finished_event("j1", "w1")).await;
    ctx.send(lost_event("w1")).await;
    ctx.send(register_event("w1", &[])).await;
    ctx.send(finished_event("j1", "w1")).await;
    assert_eq!(ctx.state("j1"), JobState::Running);

    ctx.send(finished_event("j1", "w2")).await;
    assert_eq!(ctx.state("j1"), JobState::Finished);
}
