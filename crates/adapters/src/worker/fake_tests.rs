// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use drts_core::Peer;
use serde_json::json;

fn assignment(job: &str, rank: u32) -> Assignment {
    Assignment {
        job_id: JobId::new(job),
        rank,
        peers: vec![
            Peer {
                name: WorkerName::new("w1"),
                hostname: "w1.test".to_string(),
            },
            Peer {
                name: WorkerName::new("w2"),
                hostname: "w2.test".to_string(),
            },
        ],
        payload: json!({ "cmd": "run" }),
    }
}

#[tokio::test]
async fn records_dispatch_and_cancel_in_order() {
    let adapter = FakeWorkerAdapter::new();
    let w1 = WorkerName::new("w1");
    let w2 = WorkerName::new("w2");

    adapter.dispatch(&w1, assignment("j1", 0)).await.unwrap();
    adapter.dispatch(&w2, assignment("j1", 1)).await.unwrap();
    adapter.cancel(&w2, &JobId::new("j1")).await.unwrap();

    let calls = adapter.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(&calls[2], WorkerCall::Cancel { worker, .. } if worker == "w2"));

    let dispatches = adapter.dispatches(&JobId::new("j1"));
    assert_eq!(dispatches.len(), 2);
    assert_eq!(dispatches[0].0, "w1");
    assert_eq!(dispatches[1].1.rank, 1);
    assert_eq!(adapter.cancels(&JobId::new("j1")), vec![w2]);
}

#[tokio::test]
async fn dispatches_filter_by_job() {
    let adapter = FakeWorkerAdapter::new();
    let w1 = WorkerName::new("w1");
    adapter.dispatch(&w1, assignment("j1", 0)).await.unwrap();
    adapter.dispatch(&w1, assignment("j2", 0)).await.unwrap();

    assert_eq!(adapter.dispatches(&JobId::new("j2")).len(), 1);
    assert!(adapter.cancels(&JobId::new("j2")).is_empty());
}

#[tokio::test]
async fn unreachable_worker_rejects_sends() {
    let adapter = FakeWorkerAdapter::new();
    let w1 = WorkerName::new("w1");
    adapter.fail_for("w1");

    let err = adapter.dispatch(&w1, assignment("j1", 0)).await.unwrap_err();
    assert_eq!(err, WorkerAdapterError::NotConnected(w1.clone()));
    assert!(adapter.cancel(&w1, &JobId::new("j1")).await.is_err());
    assert!(adapter.calls().is_empty());

    adapter.restore("w1");
    assert!(adapter.cancel(&w1, &JobId::new("j1")).await.is_ok());
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn clear_forgets_calls() {
    let adapter = FakeWorkerAdapter::new();
    adapter
        .cancel(&WorkerName::new("w1"), &JobId::new("j1"))
        .await
        .unwrap();
    adapter.clear();
    assert!(adapter.calls().is_empty());
}
