// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and
//! handling them without blocking the engine loop. State changes travel to
//! the engine loop as envelopes on the EventBus; queries read the runtime.

mod client;
mod worker;

use std::sync::Arc;
use std::time::Instant;

use drts_core::UuidIdGen;
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::event_bus::{BusError, EventBus};
use crate::lifecycle::DaemonRuntime;
use crate::protocol::{self, Request, DEFAULT_TIMEOUT};
use crate::sessions::WorkerSessions;

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    ctx: Arc<ListenCtx>,
}

/// Everything a connection handler may touch
pub struct ListenCtx {
    pub event_bus: EventBus,
    /// Read-only: job and worker queries, update subscriptions
    pub runtime: Arc<DaemonRuntime>,
    pub sessions: WorkerSessions,
    pub ids: UuidIdGen,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Event bus error: {0}")]
    Bus(#[from] BusError),
}

impl Listener {
    pub fn new(socket: UnixListener, ctx: ListenCtx) -> Self {
        Self {
            socket,
            ctx: Arc::new(ctx),
        }
    }

    /// Run the listener loop until shutdown, spawning tasks for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, ctx).await {
                            match e {
                                ConnectionError::Protocol(
                                    protocol::ProtocolError::ConnectionClosed,
                                ) => debug!("Client disconnected"),
                                ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
                                    warn!("Connection timeout")
                                }
                                _ => error!("Connection error: {}", e),
                            }
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single connection: one request and its response, or a worker session.
pub(crate) async fn handle_connection(
    stream: UnixStream,
    ctx: Arc<ListenCtx>,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await?;

    if let Request::Register { registration } = request {
        tracing::info!(worker = %registration.name, host = %registration.hostname, "worker connected");
        return worker::run_session(reader, writer, registration, &ctx).await;
    }

    // Polling requests are frequent; keep them out of the info log
    if matches!(
        request,
        Request::Ping | Request::Status { .. } | Request::ListJobs | Request::ListWorkers
    ) {
        debug!(request = ?request, "received request");
    } else {
        tracing::info!(request = ?request, "received request");
    }

    let response = client::handle_request(request, &ctx).await?;

    debug!("Sending response: {:?}", response);
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await?;

    Ok(())
}

#[cfg(test)]
#[path = "../listener_tests/mod.rs"]
mod tests;
