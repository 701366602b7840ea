// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol errors are rejected synchronously and change nothing

use super::*;
use crate::RegistryError;
use drts_core::JobError;

#[tokio::test]
async fn duplicate_live_registration_is_rejected() {
    let ctx = setup();
    ctx.send(register_event("w1", &["a"])).await;

    let err = ctx
        .process(register_event("w1", &["b"]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Registry(RegistryError::DuplicateRegistration(name("w1")))
    );
    assert_eq!(ctx.runtime.workers().len(), 1);
    assert_eq!(ctx.runtime.workers()[0].generation, 1);
}

#[tokio::test]
async fn unknown_job_is_rejected() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;

    for event in [
        cancel_event("ghost"),
        finished_event("ghost", "w1"),
        collect_event("ghost"),
    ] {
        let err = ctx.process(event).await.unwrap_err();
        assert_eq!(err, RuntimeError::Job(JobError::Unknown(JobId::new("ghost"))));
    }
}

#[tokio::test]
async fn unknown_worker_is_rejected() {
    let ctx = setup();
    ctx.send(submit_event("j1", &[], 1)).await;

    for event in [
        heartbeat_event("ghost"),
        lost_event("ghost"),
        finished_event("j1", "ghost"),
    ] {
        let err = ctx.process(event).await.unwrap_err();
        assert_eq!(
            err,
            RuntimeError::Registry(RegistryError::UnknownWorker(name("ghost")))
        );
    }
    assert_eq!(ctx.state("j1"), JobState::Pending);
}

#[tokio::test]
async fn ack_from_unassigned_worker_is_rejected() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;

    let err = ctx.process(finished_event("j1", "w2")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Job(JobError::NotAssigned { .. })));
    assert_eq!(ctx.state("j1"), JobState::Running);
}

#[tokio::test]
async fn conflicting_ack_is_rejected() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 2)).await;
    ctx.send(finished_event("j1", "w1")).await;

    let err = ctx
        .process(failed_event("j1", "w1", "late"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Job(JobError::ConflictingAck { .. })
    ));
    assert_eq!(ctx.state("j1"), JobState::Running);
}

#[tokio::test]
async fn terminal_jobs_accept_no_transitions() {
    let ctx = setup();
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(cancel_event("j1")).await;

    let err = ctx.process(cancel_event("j1")).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Job(JobError::InvalidTransition {
            state: JobState::Canceled,
            ..
        })
    ));
}

#[tokio::test]
async fn collect_before_terminal_is_rejected() {
    let ctx = setup();
    ctx.send(submit_event("j1", &[], 1)).await;

    let err = ctx.runtime.collect(&JobId::new("j1")).await.unwrap_err();
    assert_eq!(
        err,
        RuntimeError::Job(JobError::NotTerminal {
            id: JobId::new("j1"),
            state: JobState::Pending
        })
    );
    assert_eq!(ctx.state("j1"), JobState::Pending);
}

#[tokio::test]
async fn duplicate_and_invalid_submissions_are_rejected() {
    let ctx = setup();
    ctx.send(submit_event("j1", &[], 1)).await;

    let err = ctx.process(submit_event("j1", &[], 1)).await.unwrap_err();
    assert_eq!(err, RuntimeError::Job(JobError::AlreadyExists(JobId::new("j1"))));

    let err = ctx.process(submit_event("j2", &[], 0)).await.unwrap_err();
    assert_eq!(err, RuntimeError::Job(JobError::InvalidDegree { id: JobId::new("j2") }));
}

#[tokio::test]
async fn heartbeat_from_lost_worker_is_rejected() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(lost_event("w1")).await;

    let err = ctx.process(heartbeat_event("w1")).await.unwrap_err();
    assert_eq!(err, RuntimeError::Registry(RegistryError::Lost(name("w1"))));
}
