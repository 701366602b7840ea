// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn noop_accepts_everything() {
    let adapter = NoOpWorkerAdapter::new();
    let worker = WorkerName::new("w1");
    let assignment = Assignment {
        job_id: JobId::new("job-1"),
        rank: 0,
        peers: Vec::new(),
        payload: serde_json::Value::Null,
    };
    assert!(adapter.dispatch(&worker, assignment).await.is_ok());
    assert!(adapter.cancel(&worker, &JobId::new("job-1")).await.is_ok());
}
