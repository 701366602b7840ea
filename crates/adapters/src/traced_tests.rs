// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::worker::FakeWorkerAdapter;
use serial_test::{parallel, serial};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "Should log {label}. Logs:\n{logs}");
}

fn assignment() -> Assignment {
    Assignment {
        job_id: JobId::new("job-7"),
        rank: 1,
        peers: Vec::new(),
        payload: serde_json::Value::Null,
    }
}

#[test]
#[serial(tracing)]
fn dispatch_logs_span_and_completion() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedWorker::new(FakeWorkerAdapter::new());
        traced.dispatch(&WorkerName::new("w1"), assignment()).await
    });

    assert!(result.is_ok());
    assert_log(&logs, "span name", "worker.dispatch");
    assert_log(&logs, "worker", "w1");
    assert_log(&logs, "job id", "job-7");
    assert_log(&logs, "entry message", "sending");
    assert_log(&logs, "completion", "dispatched");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[test]
#[serial(tracing)]
fn dispatch_failure_logs_error() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeWorkerAdapter::new();
        fake.fail_for("w1");
        TracedWorker::new(fake)
            .dispatch(&WorkerName::new("w1"), assignment())
            .await
    });

    assert!(result.is_err());
    assert_log(&logs, "failure", "dispatch failed");
    assert_log(&logs, "error detail", "worker not connected");
}

#[test]
#[serial(tracing)]
fn cancel_logs_outcome() {
    let (logs, _) = with_tracing(|| async {
        let fake = FakeWorkerAdapter::new();
        fake.fail_for("w2");
        let traced = TracedWorker::new(fake);
        let job = JobId::new("job-7");
        let _ = traced.cancel(&WorkerName::new("w1"), &job).await;
        let _ = traced.cancel(&WorkerName::new("w2"), &job).await;
    });

    assert_log(&logs, "span name", "worker.cancel");
    assert_log(&logs, "success", "cancel sent");
    assert_log(&logs, "failure", "cancel failed");
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_worker_delegates_to_inner() {
    let fake = FakeWorkerAdapter::new();
    let traced = TracedWorker::new(fake.clone());
    traced
        .dispatch(&WorkerName::new("w1"), assignment())
        .await
        .unwrap();
    traced
        .cancel(&WorkerName::new("w1"), &JobId::new("job-7"))
        .await
        .unwrap();

    assert_eq!(fake.calls().len(), 2);
    assert_eq!(traced.inner().calls().len(), 2);
}
