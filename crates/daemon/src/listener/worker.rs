// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker sessions.
//!
//! After `Register` the connection stays open. A writer task drains the
//! session outbox toward the worker while this task turns incoming frames
//! into events. Closing the connection reports the worker lost.

use drts_core::{Event, Registration, WorkerName};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{ConnectionError, ListenCtx};
use crate::event_bus::Reply;
use crate::protocol::{
    self, ProtocolError, Response, ServerMessage, WorkerMessage, DEFAULT_TIMEOUT,
};
use crate::sessions::Outbox;

pub(super) async fn run_session(
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    registration: Registration,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError> {
    let name = registration.name.clone();
    let (outbox, inbox) = mpsc::unbounded_channel();

    // The engine loop binds the name to this session before placement can
    // dispatch to it, and unbinds it again if the registration is refused.
    let session = ctx.sessions.open();
    let reply = ctx
        .event_bus
        .register(Event::WorkerRegister { registration }, session, outbox.clone())
        .await?;
    if let Reply::Rejected(message) = reply {
        warn!(worker = %name, %message, "registration refused");
        protocol::write_response(&mut writer, &Response::Error { message }, DEFAULT_TIMEOUT)
            .await?;
        return Ok(());
    }

    // Nothing reaches the worker before this frame: the writer starts after it
    let result =
        match protocol::write_response(&mut writer, &Response::Registered, DEFAULT_TIMEOUT).await {
            Ok(()) => {
                let writer_task = tokio::spawn(drain_outbox(writer, inbox, name.clone()));
                let result = read_frames(&mut reader, &name, &outbox, ctx).await;
                writer_task.abort();
                result
            }
            Err(e) => Err(e.into()),
        };

    let reason = match &result {
        Ok(()) => "disconnected".to_string(),
        Err(e) => e.to_string(),
    };
    info!(worker = %name, %reason, session, "worker session closed");
    ctx.event_bus
        .close(Event::WorkerLost { name, reason }, session)
        .await?;
    result
}

async fn drain_outbox(
    mut writer: OwnedWriteHalf,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
    name: WorkerName,
) {
    while let Some(message) = inbox.recv().await {
        if let Err(e) = protocol::write_frame(&mut writer, &message, DEFAULT_TIMEOUT).await {
            // Dropping the inbox makes later sends fail, which reports the worker lost
            warn!(worker = %name, error = %e, "write to worker failed");
            return;
        }
    }
}

/// Forward frames until the worker hangs up.
async fn read_frames(
    reader: &mut OwnedReadHalf,
    name: &WorkerName,
    outbox: &Outbox,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError> {
    loop {
        let bytes = match protocol::read_message(reader).await {
            Ok(bytes) => bytes,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let message: WorkerMessage = protocol::decode(&bytes)?;
        let event = into_event(message, name);

        if let Reply::Rejected(message) = ctx.event_bus.request(event).await? {
            // The worker may be gone already; its loss is reported on close
            let _ = outbox.send(ServerMessage::Rejected { message });
        }
    }
}

fn into_event(message: WorkerMessage, name: &WorkerName) -> Event {
    let worker = name.clone();
    match message {
        WorkerMessage::Heartbeat => Event::WorkerHeartbeat { name: worker },
        WorkerMessage::Finished { job_id, result } => Event::JobFinished {
            id: job_id,
            worker,
            result,
        },
        WorkerMessage::Failed { job_id, cause } => Event::JobFailed {
            id: job_id,
            worker,
            cause,
        },
        WorkerMessage::CancelAck { job_id } => Event::JobCancelAck { id: job_id, worker },
    }
}

