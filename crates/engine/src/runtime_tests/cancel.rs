// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation protocol

use super::*;
use drts_core::JobOutcome;

#[tokio::test]
async fn cancel_pending_job_is_immediate() {
    let ctx = setup();
    ctx.send(submit_event("j1", &["gpu"], 1)).await;
    ctx.send(cancel_event("j1")).await;

    let job = ctx.job("j1");
    assert_eq!(job.state, JobState::Canceled);
    assert_eq!(job.outcome, Some(JobOutcome::Canceled));
    assert!(ctx.workers.calls().is_empty());
}

#[tokio::test]
async fn cancel_running_job_waits_for_every_worker() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 2)).await;

    ctx.send(cancel_event("j1")).await;
    assert_eq!(ctx.state("j1"), JobState::Canceling);
    assert_eq!(ctx.cancelled("j1"), vec!["w1", "w2"]);

    ctx.send(cancel_ack_event("j1", "w1")).await;
    assert_eq!(ctx.state("j1"), JobState::Canceling);
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Registered);

    // Any terminal answer counts while canceling.
    ctx.send(finished_event("j1", "w2")).await;
    let job = ctx.job("j1");
    assert_eq!(job.state, JobState::Canceled);
    assert_eq!(
        job.history,
        vec![
            JobState::Pending,
            JobState::Running,
            JobState::Canceling,
            JobState::Canceled
        ]
    );
}

#[tokio::test]
async fn worker_already_answered_is_not_sent_a_cancel() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 2)).await;
    ctx.send(finished_event("j1", "w1")).await;

    ctx.send(cancel_event("j1")).await;
    assert_eq!(ctx.cancelled("j1"), vec!["w2"]);

    ctx.send(cancel_ack_event("j1", "w2")).await;
    assert_eq!(ctx.state("j1"), JobState::Canceled);
}

#[tokio::test]
async fn failure_ack_while_canceling_still_cancels() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(cancel_event("j1")).await;

    ctx.send(failed_event("j1", "w1", "interrupted")).await;
    assert_eq!(ctx.state("j1"), JobState::Canceled);
}

#[tokio::test]
async fn canceled_job_frees_workers_for_pending_jobs() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(submit_event("j2", &[], 1)).await;
    assert_eq!(ctx.state("j2"), JobState::Pending);

    ctx.send(cancel_event("j1")).await;
    assert_eq!(ctx.state("j2"), JobState::Pending);

    ctx.send(cancel_ack_event("j1", "w1")).await;
    assert_eq!(ctx.state("j2"), JobState::Running);
}
