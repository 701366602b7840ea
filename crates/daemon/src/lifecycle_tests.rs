// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::ServerMessage;
use drts_core::test_support::{
    cancel_event, collect_event, finished_event, heartbeat_event, register_event, submit_event,
};
use drts_core::{JobId, JobOutcome, JobState, WorkerName};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::{mpsc, oneshot};

fn test_config(dir: &Path) -> Config {
    Config::at(dir.to_path_buf())
}

async fn started(dir: &Path) -> StartupResult {
    startup(&test_config(dir)).await.unwrap()
}

async fn request(daemon: &DaemonState, event: Event) -> Reply {
    answer(daemon, Envelope::new(event)).await
}

async fn answer(daemon: &DaemonState, mut envelope: Envelope) -> Reply {
    let (tx, rx) = oneshot::channel();
    envelope.reply = Some(tx);
    daemon.process(envelope).await;
    rx.await.unwrap()
}

/// Register `name` from connection `session`, as a worker session does.
async fn register_session(
    daemon: &DaemonState,
    name: &str,
    session: u64,
) -> (Reply, mpsc::UnboundedReceiver<ServerMessage>) {
    let (outbox, inbox) = mpsc::unbounded_channel();
    let envelope = Envelope {
        binding: Some(Binding::Attach { session, outbox }),
        ..Envelope::new(register_event(name, &[]))
    };
    (answer(daemon, envelope).await, inbox)
}

/// Close connection `session`, as a worker session does on EOF.
async fn close_session(daemon: &DaemonState, name: &str, session: u64) {
    daemon
        .process(Envelope {
            binding: Some(Binding::Detach { session }),
            ..Envelope::new(Event::WorkerLost {
                name: WorkerName::new(name),
                reason: "disconnected".to_string(),
            })
        })
        .await;
}

#[tokio::test]
async fn startup_writes_pid_version_and_socket() {
    let dir = tempdir().unwrap();
    let result = started(dir.path()).await;
    let config = &result.daemon.config;

    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_eq!(
        std::fs::read_to_string(&config.version_path).unwrap(),
        env!("CARGO_PKG_VERSION")
    );
    assert!(config.socket_path.exists());
}

#[tokio::test]
async fn second_startup_fails_without_removing_files() {
    let dir = tempdir().unwrap();
    let first = started(dir.path()).await;

    let err = match startup(&test_config(dir.path())).await {
        Err(e) => e,
        Ok(_) => panic!("second startup should fail"),
    };
    assert!(matches!(err, LifecycleError::LockFailed(_)));

    let config = &first.daemon.config;
    assert!(config.socket_path.exists());
    assert!(config.version_path.exists());
    assert!(config.lock_path.exists());
}

#[tokio::test]
async fn invalid_settings_abort_startup_and_clean_up() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::write(&config.settings_path, "loss_policy = \"sometimes\"\n").unwrap();

    let err = match startup(&config).await {
        Err(e) => e,
        Ok(_) => panic!("startup should fail"),
    };
    assert!(matches!(err, LifecycleError::Settings { .. }));
    assert!(!config.socket_path.exists());
    assert!(!config.version_path.exists());
}

#[tokio::test]
async fn settings_reach_the_runtime() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "loss_policy = \"requeue\"\ndefault_slots = 3\n",
    )
    .unwrap();

    let result = started(dir.path()).await;
    let config = result.daemon.runtime.config();
    assert_eq!(config.loss_policy, drts_engine::LossPolicy::Requeue);
    assert_eq!(config.default_slots, 3);
}

#[tokio::test]
async fn shutdown_removes_runtime_files() {
    let dir = tempdir().unwrap();
    let StartupResult { mut daemon, .. } = started(dir.path()).await;

    daemon.shutdown().unwrap();

    assert!(!daemon.config.socket_path.exists());
    assert!(!daemon.config.lock_path.exists());
    assert!(!daemon.config.version_path.exists());
}

#[tokio::test]
async fn submit_is_acknowledged_and_dispatched_to_the_session() {
    let dir = tempdir().unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    let (outbox, mut inbox) = mpsc::unbounded_channel();
    let w1 = WorkerName::new("w1");
    daemon.sessions.attach(&w1, daemon.sessions.open(), outbox);

    assert_eq!(request(&daemon, register_event("w1", &["gpu"])).await, Reply::Ok);
    assert_eq!(request(&daemon, submit_event("job-1", &["gpu"], 1)).await, Reply::Ok);

    match inbox.recv().await {
        Some(ServerMessage::Dispatch { assignment }) => {
            assert_eq!(assignment.job_id, JobId::new("job-1"));
            assert_eq!(assignment.rank, 0);
        }
        other => panic!("expected dispatch, got {other:?}"),
    }
    let job = daemon.runtime.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.state, JobState::Running);
}

#[tokio::test]
async fn rejected_event_replies_with_reason() {
    let dir = tempdir().unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    let reply = request(&daemon, cancel_event("ghost")).await;
    assert_eq!(reply, Reply::Rejected("unknown job: ghost".to_string()));
}

#[tokio::test]
async fn collect_replies_with_the_record() {
    let dir = tempdir().unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    request(&daemon, submit_event("job-1", &[], 1)).await;
    request(&daemon, cancel_event("job-1")).await;

    match request(&daemon, collect_event("job-1")).await {
        Reply::Collected(job) => assert_eq!(job.state, JobState::Canceled),
        other => panic!("expected collected job, got {other:?}"),
    }
    assert!(daemon.runtime.job(&JobId::new("job-1")).is_none());
}

#[tokio::test]
async fn failed_dispatch_is_fed_back_as_worker_loss() {
    let dir = tempdir().unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    // Registered but no session bound: the dispatch cannot be delivered
    request(&daemon, register_event("w1", &[])).await;
    request(&daemon, submit_event("job-1", &[], 1)).await;

    let job = daemon.runtime.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.state, JobState::Failed);
    let workers = daemon.runtime.workers();
    assert!(workers[0].lost);
}

#[tokio::test]
async fn late_ack_from_unknown_worker_is_rejected() {
    let dir = tempdir().unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    let reply = request(&daemon, finished_event("job-1", "ghost")).await;
    assert!(matches!(reply, Reply::Rejected(_)));
}

#[tokio::test]
async fn expired_heartbeat_marks_worker_lost() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "heartbeat_timeout_ms = 20\n").unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    request(&daemon, register_event("w1", &[])).await;
    assert_eq!(request(&daemon, heartbeat_event("w1")).await, Reply::Ok);

    tokio::time::sleep(Duration::from_millis(40)).await;
    daemon.fire_timers().await;

    assert!(daemon.runtime.workers()[0].lost);
    assert!(matches!(
        request(&daemon, heartbeat_event("w1")).await,
        Reply::Rejected(_)
    ));
}

#[tokio::test]
async fn refused_takeover_leaves_old_session_to_report_its_loss() {
    let dir = tempdir().unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    let old = daemon.sessions.open();
    let (reply, mut old_inbox) = register_session(&daemon, "w1", old).await;
    assert_eq!(reply, Reply::Ok);
    request(&daemon, submit_event("job-1", &[], 1)).await;
    assert!(matches!(old_inbox.recv().await, Some(ServerMessage::Dispatch { .. })));

    // The restarted process registers before the old connection's close is applied
    let (reply, _new_inbox) = register_session(&daemon, "w1", daemon.sessions.open()).await;
    assert!(matches!(reply, Reply::Rejected(_)));
    close_session(&daemon, "w1", old).await;

    assert!(daemon.runtime.workers()[0].lost);
    let job = daemon.runtime.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.state, JobState::Failed);

    // Retrying now binds the new connection
    let (reply, mut new_inbox) = register_session(&daemon, "w1", daemon.sessions.open()).await;
    assert_eq!(reply, Reply::Ok);
    request(&daemon, submit_event("job-2", &[], 1)).await;
    match new_inbox.recv().await {
        Some(ServerMessage::Dispatch { assignment }) => {
            assert_eq!(assignment.job_id, JobId::new("job-2"))
        }
        other => panic!("expected dispatch, got {other:?}"),
    }
}

#[tokio::test]
async fn close_of_a_superseded_session_is_ignored() {
    let dir = tempdir().unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    let old = daemon.sessions.open();
    let (_, _old_inbox) = register_session(&daemon, "w1", old).await;
    // Lost while its connection is still open, e.g. a failed send
    request(
        &daemon,
        Event::WorkerLost {
            name: WorkerName::new("w1"),
            reason: "send failed".to_string(),
        },
    )
    .await;

    let (reply, _new_inbox) = register_session(&daemon, "w1", daemon.sessions.open()).await;
    assert_eq!(reply, Reply::Ok);
    close_session(&daemon, "w1", old).await;

    assert!(!daemon.runtime.workers()[0].lost);
}

#[tokio::test]
async fn expired_timers_apply_earliest_first() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "heartbeat_timeout_ms = 20\n").unwrap();
    let StartupResult { daemon, .. } = started(dir.path()).await;

    let (_, _w1) = register_session(&daemon, "w1", daemon.sessions.open()).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let (_, _w2) = register_session(&daemon, "w2", daemon.sessions.open()).await;
    request(&daemon, submit_event("job-1", &[], 2)).await;

    tokio::time::sleep(Duration::from_millis(40)).await;
    daemon.fire_timers().await;

    let job = daemon.runtime.job(&JobId::new("job-1")).unwrap();
    assert_eq!(job.state, JobState::Failed);
    match job.outcome {
        Some(JobOutcome::Failed { worker, .. }) => assert_eq!(worker, Some(WorkerName::new("w1"))),
        other => panic!("expected failure, got {other:?}"),
    }
}
