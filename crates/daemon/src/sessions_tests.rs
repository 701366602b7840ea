// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn assignment(job: &str) -> Assignment {
    Assignment {
        job_id: JobId::new(job),
        rank: 0,
        peers: vec![],
        payload: json!({}),
    }
}

#[tokio::test]
async fn dispatch_reaches_the_bound_session() {
    let sessions = WorkerSessions::new();
    let (outbox, mut inbox) = mpsc::unbounded_channel();
    let w1 = WorkerName::new("w1");
    let id = sessions.open();
    assert!(sessions.attach(&w1, id, outbox).is_none());

    sessions.dispatch(&w1, assignment("job-1")).await.unwrap();
    sessions.cancel(&w1, &JobId::new("job-1")).await.unwrap();

    assert_eq!(
        inbox.recv().await,
        Some(ServerMessage::Dispatch {
            assignment: assignment("job-1")
        })
    );
    assert_eq!(
        inbox.recv().await,
        Some(ServerMessage::Cancel {
            job_id: JobId::new("job-1")
        })
    );
}

#[tokio::test]
async fn unbound_worker_is_not_connected() {
    let sessions = WorkerSessions::new();
    let err = sessions
        .dispatch(&WorkerName::new("ghost"), assignment("job-1"))
        .await
        .unwrap_err();
    assert_eq!(err, WorkerAdapterError::NotConnected(WorkerName::new("ghost")));
}

#[tokio::test]
async fn closed_session_fails_the_send() {
    let sessions = WorkerSessions::new();
    let (outbox, inbox) = mpsc::unbounded_channel();
    let w1 = WorkerName::new("w1");
    sessions.attach(&w1, sessions.open(), outbox);
    drop(inbox);

    let err = sessions
        .cancel(&w1, &JobId::new("job-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerAdapterError::SendFailed { .. }));
}

#[test]
fn stale_connection_cannot_detach_a_newer_one() {
    let sessions = WorkerSessions::new();
    let w1 = WorkerName::new("w1");
    let (old_outbox, _old_inbox) = mpsc::unbounded_channel();
    let (new_outbox, _new_inbox) = mpsc::unbounded_channel();

    let old = sessions.open();
    sessions.attach(&w1, old, old_outbox);
    let new = sessions.open();
    assert!(sessions.attach(&w1, new, new_outbox).is_some());

    assert!(!sessions.detach(&w1, old));
    assert!(sessions.detach(&w1, new));
    assert!(!sessions.detach(&w1, new));
}

#[tokio::test]
async fn restore_reinstates_the_replaced_session() {
    let sessions = WorkerSessions::new();
    let w1 = WorkerName::new("w1");
    let (live_outbox, mut live_inbox) = mpsc::unbounded_channel();
    let (refused_outbox, _refused_inbox) = mpsc::unbounded_channel();

    let live = sessions.open();
    sessions.attach(&w1, live, live_outbox);
    let refused = sessions.open();
    let previous = sessions.attach(&w1, refused, refused_outbox);
    sessions.restore(&w1, refused, previous);

    sessions.cancel(&w1, &JobId::new("job-1")).await.unwrap();
    assert!(live_inbox.recv().await.is_some());
    assert!(sessions.detach(&w1, live));
}

#[test]
fn restore_without_previous_unbinds() {
    let sessions = WorkerSessions::new();
    let w1 = WorkerName::new("w1");
    let (outbox, _inbox) = mpsc::unbounded_channel();
    let id = sessions.open();
    let previous = sessions.attach(&w1, id, outbox);
    sessions.restore(&w1, id, previous);
    assert!(!sessions.detach(&w1, id));
}
