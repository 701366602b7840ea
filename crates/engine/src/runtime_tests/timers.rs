// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat and acknowledgement timeouts

use super::*;
use drts_core::TimerId;

#[tokio::test]
async fn silent_worker_is_marked_lost() {
    let ctx = setup_with(RuntimeConfig {
        heartbeat_timeout: Some(Duration::from_secs(5)),
        ..RuntimeConfig::default()
    });
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;

    ctx.advance(Duration::from_secs(3)).await;
    ctx.send(heartbeat_event("w1")).await;
    ctx.advance(Duration::from_secs(3)).await;
    assert_eq!(ctx.worker_status("w1"), busy(&["j1"]));

    ctx.advance(Duration::from_secs(3)).await;
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Lost);
    assert_eq!(ctx.state("j1"), JobState::Failed);
}

#[tokio::test]
async fn heartbeat_timer_stops_when_worker_is_lost() {
    let ctx = setup_with(RuntimeConfig {
        heartbeat_timeout: Some(Duration::from_secs(5)),
        ..RuntimeConfig::default()
    });
    ctx.send(register_event("w1", &[])).await;
    let id = TimerId::heartbeat(&name("w1"));
    assert!(ctx.runtime.scheduler().lock().is_set(&id));

    ctx.send(lost_event("w1")).await;
    assert!(!ctx.runtime.scheduler().lock().is_set(&id));
}

#[tokio::test]
async fn ack_timeout_fails_running_job_and_drains_workers() {
    let ctx = setup_with(RuntimeConfig {
        ack_timeout: Some(Duration::from_secs(10)),
        ..RuntimeConfig::default()
    });
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;

    ctx.advance(Duration::from_secs(11)).await;
    assert_eq!(ctx.state("j1"), JobState::Failed);
    assert_eq!(ctx.cancelled("j1"), vec!["w1"]);
    assert_eq!(ctx.worker_status("w1"), busy(&["j1"]));

    ctx.send(cancel_ack_event("j1", "w1")).await;
    assert_eq!(ctx.worker_status("w1"), WorkerStatus::Registered);
}

#[tokio::test]
async fn ack_timeout_also_bounds_canceling() {
    let ctx = setup_with(RuntimeConfig {
        ack_timeout: Some(Duration::from_secs(10)),
        ..RuntimeConfig::default()
    });
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(cancel_event("j1")).await;

    ctx.advance(Duration::from_secs(11)).await;
    assert_eq!(ctx.state("j1"), JobState::Failed);
}

#[tokio::test]
async fn finished_job_clears_ack_timeout() {
    let ctx = setup_with(RuntimeConfig {
        ack_timeout: Some(Duration::from_secs(10)),
        ..RuntimeConfig::default()
    });
    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;
    let id = TimerId::ack_timeout(&JobId::new("j1"));
    assert!(ctx.runtime.scheduler().lock().is_set(&id));

    ctx.send(finished_event("j1", "w1")).await;
    assert!(!ctx.runtime.scheduler().lock().is_set(&id));

    ctx.advance(Duration::from_secs(20)).await;
    assert_eq!(ctx.state("j1"), JobState::Finished);
}

#[tokio::test]
async fn stale_ack_timeout_is_ignored() {
    let ctx = setup();
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(timer_event(TimerId::ack_timeout(&JobId::new("j1"))))
        .await;
    ctx.send(timer_event(TimerId::ack_timeout(&JobId::new("gone"))))
        .await;
    ctx.send(timer_event(TimerId::new("mystery"))).await;
    assert_eq!(ctx.state("j1"), JobState::Pending);
}
