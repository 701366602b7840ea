// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drts_core::JobState;

#[tokio::test]
async fn ping_and_hello() {
    let h = harness().await;
    assert_eq!(h.call(Request::Ping).await, Response::Pong);
    assert_eq!(
        h.call(Request::Hello {
            version: "0.0.0".into()
        })
        .await,
        Response::Hello {
            version: protocol::PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn submit_without_id_generates_one() {
    let h = harness().await;
    let response = h
        .call(Request::Submit {
            id: None,
            requirements: Requirements::default(),
            payload: json!(null),
        })
        .await;

    let Response::Submitted { id } = response else {
        panic!("expected submitted, got {response:?}");
    };
    assert!(!id.is_empty());
    assert_eq!(h.job_state(&id).await, JobState::Pending);
}

#[tokio::test]
async fn duplicate_submit_is_an_error() {
    let h = harness().await;
    h.submit("job-1", &[], 1).await;
    assert_eq!(
        h.submit("job-1", &[], 1).await,
        Response::Error {
            message: "job already exists: job-1".into()
        }
    );
}

#[tokio::test]
async fn zero_degree_is_refused() {
    let h = harness().await;
    let response = h.submit("job-0", &[], 0).await;
    assert!(matches!(response, Response::Error { .. }));
    assert!(matches!(
        h.call(Request::Status { id: "job-0".into() }).await,
        Response::Error { .. }
    ));
}

#[tokio::test]
async fn status_of_unknown_job() {
    let h = harness().await;
    assert_eq!(
        h.call(Request::Status { id: "nope".into() }).await,
        Response::Error {
            message: "unknown job: nope".into()
        }
    );
}

#[tokio::test]
async fn cancel_pending_then_cleanup() {
    let h = harness().await;
    h.submit("job-1", &[], 1).await;

    assert_eq!(h.call(Request::Cancel { id: "job-1".into() }).await, Response::Ok);
    assert_eq!(h.job_state("job-1").await, JobState::Canceled);

    match h.call(Request::Cleanup { id: "job-1".into() }).await {
        Response::Job { job } => assert_eq!(job.state, JobState::Canceled),
        other => panic!("expected job, got {other:?}"),
    }
    assert!(matches!(
        h.call(Request::Status { id: "job-1".into() }).await,
        Response::Error { .. }
    ));
}

#[tokio::test]
async fn cleanup_refuses_live_jobs() {
    let h = harness().await;
    h.submit("job-1", &[], 1).await;
    assert_eq!(
        h.call(Request::Cleanup { id: "job-1".into() }).await,
        Response::Error {
            message: "job job-1 is pending, not terminal".into()
        }
    );
}

#[tokio::test]
async fn wait_returns_terminal_record_immediately() {
    let h = harness().await;
    h.submit("job-1", &[], 1).await;
    h.call(Request::Cancel { id: "job-1".into() }).await;

    match h
        .call(Request::Wait {
            id: "job-1".into(),
            timeout_ms: None,
        })
        .await
    {
        Response::Job { job } => assert_eq!(job.state, JobState::Canceled),
        other => panic!("expected job, got {other:?}"),
    }
}

#[tokio::test]
async fn wait_times_out_on_pending_job() {
    let h = harness().await;
    h.submit("job-1", &[], 1).await;
    assert_eq!(
        h.call(Request::Wait {
            id: "job-1".into(),
            timeout_ms: Some(20),
        })
        .await,
        Response::Error {
            message: "timed out waiting for job job-1".into()
        }
    );
}

#[tokio::test]
async fn wait_wakes_on_cancel() {
    let h = harness().await;
    h.submit("job-1", &[], 1).await;

    let mut waiter = h.connect();
    protocol::write_frame(
        &mut waiter,
        &Request::Wait {
            id: "job-1".into(),
            timeout_ms: Some(2_000),
        },
        DEFAULT_TIMEOUT,
    )
    .await
    .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    h.call(Request::Cancel { id: "job-1".into() }).await;

    let response: Response = protocol::read_frame(&mut waiter, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    match response {
        Response::Job { job } => assert_eq!(job.state, JobState::Canceled),
        other => panic!("expected job, got {other:?}"),
    }
}

#[tokio::test]
async fn listings_and_info() {
    let h = harness().await;
    h.submit("job-1", &["gpu"], 2).await;
    let _w1 = h.register("w1", &["cpu"]).await;

    match h.call(Request::ListJobs).await {
        Response::Jobs { jobs } => {
            assert_eq!(jobs.len(), 1);
            assert_eq!(jobs[0].id, "job-1");
            assert_eq!(jobs[0].degree, 2);
        }
        other => panic!("expected jobs, got {other:?}"),
    }
    match h.call(Request::ListWorkers).await {
        Response::Workers { workers } => {
            assert_eq!(workers.len(), 1);
            assert_eq!(workers[0].name, "w1");
            assert_eq!(workers[0].status, "registered");
        }
        other => panic!("expected workers, got {other:?}"),
    }
    match h.call(Request::Info).await {
        Response::Info {
            jobs_active,
            workers_live,
            ..
        } => {
            assert_eq!(jobs_active, 1);
            assert_eq!(workers_live, 1);
        }
        other => panic!("expected info, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_notifies_the_engine_loop() {
    let h = harness().await;
    let notified = {
        let shutdown = Arc::clone(&h.ctx.shutdown);
        tokio::spawn(async move { shutdown.notified().await })
    };
    assert_eq!(h.call(Request::Shutdown).await, Response::ShuttingDown);
    notified.await.unwrap();
}
