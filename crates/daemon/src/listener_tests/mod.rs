// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event_bus::EventReader;
use crate::lifecycle::{startup, Config, DaemonState, StartupResult};
use crate::protocol::{Response, ServerMessage, WorkerMessage};
use drts_core::test_support::{caps, registration};
use drts_core::Requirements;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

mod client;
mod worker;

/// A started daemon whose engine loop runs in the background.
struct Harness {
    ctx: Arc<ListenCtx>,
    /// Held to stop the engine loop before it applies the next envelope
    gate: Arc<tokio::sync::Mutex<()>>,
    /// Envelopes taken off the bus so far
    received: Arc<AtomicUsize>,
    _dir: TempDir,
}

fn spawn_engine(
    daemon: DaemonState,
    mut reader: EventReader,
    gate: Arc<tokio::sync::Mutex<()>>,
    received: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        while let Some(envelope) = reader.recv().await {
            received.fetch_add(1, Ordering::SeqCst);
            let _open = gate.lock().await;
            daemon.process(envelope).await;
        }
    });
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let StartupResult {
        daemon,
        event_reader,
        ..
    } = startup(&Config::at(dir.path().to_path_buf())).await.unwrap();

    let ctx = Arc::new(ListenCtx {
        event_bus: daemon.event_bus.clone(),
        runtime: Arc::clone(&daemon.runtime),
        sessions: daemon.sessions.clone(),
        ids: UuidIdGen,
        start_time: daemon.start_time,
        shutdown: Arc::new(Notify::new()),
    });
    let gate = Arc::new(tokio::sync::Mutex::new(()));
    let received = Arc::new(AtomicUsize::new(0));
    spawn_engine(daemon, event_reader, Arc::clone(&gate), Arc::clone(&received));
    Harness {
        ctx,
        gate,
        received,
        _dir: dir,
    }
}

impl Harness {
    /// Stop the engine loop until the guard is dropped.
    async fn pause(&self) -> tokio::sync::OwnedMutexGuard<()> {
        Arc::clone(&self.gate).lock_owned().await
    }

    /// Wait until the engine loop has taken `count` envelopes off the bus.
    async fn wait_received(&self, count: usize) {
        for _ in 0..200 {
            if self.received.load(Ordering::SeqCst) >= count {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("engine loop never received {count} envelopes");
    }

    /// Open a connection served by `handle_connection`.
    fn connect(&self) -> UnixStream {
        let (client, server) = UnixStream::pair().unwrap();
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            let _ = handle_connection(server, ctx).await;
        });
        client
    }

    async fn call(&self, request: Request) -> Response {
        let mut stream = self.connect();
        protocol::write_frame(&mut stream, &request, DEFAULT_TIMEOUT)
            .await
            .unwrap();
        protocol::read_frame(&mut stream, DEFAULT_TIMEOUT).await.unwrap()
    }

    async fn submit(&self, id: &str, capabilities: &[&str], degree: u32) -> Response {
        self.call(Request::Submit {
            id: Some(id.to_string()),
            requirements: Requirements::new(caps(capabilities)).with_degree(degree),
            payload: json!({ "job": id }),
        })
        .await
    }

    /// Register a worker session and return its open stream.
    async fn register(&self, name: &str, capabilities: &[&str]) -> UnixStream {
        let mut stream = self.connect();
        protocol::write_frame(
            &mut stream,
            &Request::Register {
                registration: registration(name, capabilities),
            },
            DEFAULT_TIMEOUT,
        )
        .await
        .unwrap();
        let response: Response = protocol::read_frame(&mut stream, DEFAULT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(response, Response::Registered);
        stream
    }

    async fn job_state(&self, id: &str) -> drts_core::JobState {
        match self.call(Request::Status { id: id.to_string() }).await {
            Response::Job { job } => job.state,
            other => panic!("expected job, got {other:?}"),
        }
    }
}

async fn next_message(stream: &mut UnixStream) -> ServerMessage {
    protocol::read_frame(stream, DEFAULT_TIMEOUT).await.unwrap()
}

async fn send(stream: &mut UnixStream, message: WorkerMessage) {
    protocol::write_frame(stream, &message, DEFAULT_TIMEOUT)
        .await
        .unwrap();
}
