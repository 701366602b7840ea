// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drts_core::{JobId, JobState};
use std::sync::atomic::Ordering;
use std::time::Duration;

async fn dispatched(stream: &mut UnixStream) -> drts_adapters::Assignment {
    match next_message(stream).await {
        ServerMessage::Dispatch { assignment } => assignment,
        other => panic!("expected dispatch, got {other:?}"),
    }
}

/// Poll until the job reaches `state`; worker frames are applied asynchronously.
async fn settle_to(h: &Harness, id: &str, state: JobState) {
    for _ in 0..100 {
        if h.job_state(id).await == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {id} never reached {state}");
}

#[tokio::test]
async fn dispatched_job_finishes_on_ack() {
    let h = harness().await;
    let mut w1 = h.register("w1", &["gpu"]).await;
    h.submit("job-1", &["gpu"], 1).await;

    let assignment = dispatched(&mut w1).await;
    assert_eq!(assignment.job_id, JobId::new("job-1"));
    assert_eq!(assignment.payload, json!({ "job": "job-1" }));

    send(
        &mut w1,
        WorkerMessage::Finished {
            job_id: JobId::new("job-1"),
            result: json!("ok"),
        },
    )
    .await;
    settle_to(&h, "job-1", JobState::Finished).await;
}

#[tokio::test]
async fn coallocated_workers_share_a_peer_list() {
    let h = harness().await;
    let mut w1 = h.register("w1", &["mpi"]).await;
    let mut w2 = h.register("w2", &["mpi"]).await;
    h.submit("job-1", &["mpi"], 2).await;

    let a1 = dispatched(&mut w1).await;
    let a2 = dispatched(&mut w2).await;
    assert_eq!(a1.peers, a2.peers);
    assert_eq!(a1.peers.len(), 2);
    let mut ranks = vec![a1.rank, a2.rank];
    ranks.sort();
    assert_eq!(ranks, vec![0, 1]);
}

#[tokio::test]
async fn disconnect_fails_running_job() {
    let h = harness().await;
    let mut w1 = h.register("w1", &[]).await;
    h.submit("job-1", &[], 1).await;
    dispatched(&mut w1).await;

    drop(w1);
    settle_to(&h, "job-1", JobState::Failed).await;

    match h.call(Request::ListWorkers).await {
        Response::Workers { workers } => assert_eq!(workers[0].status, "lost"),
        other => panic!("expected workers, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_reaches_worker_and_ack_completes_it() {
    let h = harness().await;
    let mut w1 = h.register("w1", &[]).await;
    h.submit("job-1", &[], 1).await;
    dispatched(&mut w1).await;

    assert_eq!(h.call(Request::Cancel { id: "job-1".into() }).await, Response::Ok);
    assert_eq!(h.job_state("job-1").await, JobState::Canceling);
    assert_eq!(
        next_message(&mut w1).await,
        ServerMessage::Cancel {
            job_id: JobId::new("job-1")
        }
    );

    send(
        &mut w1,
        WorkerMessage::CancelAck {
            job_id: JobId::new("job-1"),
        },
    )
    .await;
    settle_to(&h, "job-1", JobState::Canceled).await;
}

#[tokio::test]
async fn ack_for_foreign_job_is_rejected() {
    let h = harness().await;
    let mut w1 = h.register("w1", &[]).await;

    send(
        &mut w1,
        WorkerMessage::Finished {
            job_id: JobId::new("ghost"),
            result: json!(null),
        },
    )
    .await;
    assert_eq!(
        next_message(&mut w1).await,
        ServerMessage::Rejected {
            message: "unknown job: ghost".into()
        }
    );
}

#[tokio::test]
async fn duplicate_live_registration_is_refused() {
    let h = harness().await;
    let mut first = h.register("w1", &[]).await;

    let mut second = h.connect();
    protocol::write_frame(
        &mut second,
        &Request::Register {
            registration: registration("w1", &[]),
        },
        DEFAULT_TIMEOUT,
    )
    .await
    .unwrap();
    let response: Response = protocol::read_frame(&mut second, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert!(matches!(response, Response::Error { .. }));

    // The first session still receives work
    h.submit("job-1", &[], 1).await;
    assert_eq!(dispatched(&mut first).await.job_id, JobId::new("job-1"));
}

#[tokio::test]
async fn restart_racing_the_old_close_still_reports_the_loss() {
    let h = harness().await;
    let mut old = h.register("w1", &[]).await;
    h.submit("job-1", &[], 1).await;
    dispatched(&mut old).await;

    // The new registration reaches the engine loop ahead of the old close
    let paused = h.pause().await;
    let seen = h.received.load(Ordering::SeqCst);
    let mut restarted = h.connect();
    protocol::write_frame(
        &mut restarted,
        &Request::Register {
            registration: registration("w1", &[]),
        },
        DEFAULT_TIMEOUT,
    )
    .await
    .unwrap();
    h.wait_received(seen + 1).await;
    drop(old);
    drop(paused);

    let response: Response = protocol::read_frame(&mut restarted, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert!(matches!(response, Response::Error { .. }));
    settle_to(&h, "job-1", JobState::Failed).await;
    match h.call(Request::ListWorkers).await {
        Response::Workers { workers } => assert_eq!(workers[0].status, "lost"),
        other => panic!("expected workers, got {other:?}"),
    }

    let mut retried = h.register("w1", &[]).await;
    h.submit("job-2", &[], 1).await;
    assert_eq!(dispatched(&mut retried).await.job_id, JobId::new("job-2"));
}

#[tokio::test]
async fn heartbeat_is_accepted_silently() {
    let h = harness().await;
    let mut w1 = h.register("w1", &[]).await;
    send(&mut w1, WorkerMessage::Heartbeat).await;
    h.submit("job-1", &[], 1).await;

    // The next frame is the dispatch, not a rejection
    assert!(matches!(
        next_message(&mut w1).await,
        ServerMessage::Dispatch { .. }
    ));
}
