// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `drts workers` and the minimal `drts worker` session

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use tokio::net::unix::OwnedReadHalf;
use tokio::sync::mpsc;

use drts_core::{Capability, Registration, ResourceBudget, WorkerName};
use drts_daemon::protocol::{self, ProtocolError};
use drts_daemon::{Request, Response, ServerMessage, WorkerMessage};

use crate::client::{timeout_ipc, DaemonClient};
use crate::output::{print_json, OutputFormat};
use crate::table::{Column, Table};

pub async fn list(format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let workers = client.list_workers().await?;

    match format {
        OutputFormat::Text => {
            if workers.is_empty() {
                println!("No workers");
                return Ok(());
            }
            let mut table = Table::new(vec![
                Column::left("NAME"),
                Column::left("HOST"),
                Column::left("STATUS"),
                Column::right("LOAD"),
                Column::left("CAPABILITIES"),
            ]);
            for worker in &workers {
                table.row(vec![
                    worker.name.clone(),
                    worker.hostname.clone(),
                    worker.status.clone(),
                    format!("{}/{}", worker.load, worker.slots),
                    worker.capabilities.clone(),
                ]);
            }
            table.render(&mut std::io::stdout());
        }
        OutputFormat::Json => print_json(&workers)?,
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Worker name, unique among live workers
    #[arg(long)]
    pub name: String,

    /// Hostname reported to peers (defaults to $HOSTNAME)
    #[arg(long)]
    pub hostname: Option<String>,

    /// Advertised capability, NAME or NAME=VALUE (repeatable)
    #[arg(long = "capability", short = 'c')]
    pub capabilities: Vec<Capability>,

    /// Concurrent job limit (daemon default when omitted)
    #[arg(long)]
    pub slots: Option<u32>,

    /// Answer every dispatch with a failure instead of a result
    #[arg(long)]
    pub fail: bool,

    /// Heartbeat interval in milliseconds (0 disables heartbeats)
    #[arg(long, default_value_t = 1000)]
    pub heartbeat_ms: u64,
}

impl WorkerArgs {
    pub fn registration(&self) -> Registration {
        Registration {
            name: WorkerName::new(&self.name),
            hostname: self
                .hostname
                .clone()
                .or_else(crate::env::hostname)
                .unwrap_or_else(|| "localhost".to_string()),
            capabilities: self.capabilities.iter().cloned().collect(),
            budget: ResourceBudget::default(),
            slots: self.slots,
        }
    }
}

/// Reply this worker sends for one server instruction
pub(crate) fn answer(message: ServerMessage, fail: bool, name: &str) -> Option<WorkerMessage> {
    match message {
        ServerMessage::Dispatch { assignment } if fail => Some(WorkerMessage::Failed {
            job_id: assignment.job_id,
            cause: format!("{} refused the job", name),
        }),
        ServerMessage::Dispatch { assignment } => Some(WorkerMessage::Finished {
            job_id: assignment.job_id,
            result: serde_json::json!({
                "worker": name,
                "rank": assignment.rank,
                "peers": assignment.peers.len(),
            }),
        }),
        ServerMessage::Cancel { job_id } => Some(WorkerMessage::CancelAck { job_id }),
        ServerMessage::Rejected { message } => {
            eprintln!("warn: daemon rejected message: {}", message);
            None
        }
    }
}

/// Register and serve until the daemon closes the connection or ctrl-c.
pub async fn run(args: WorkerArgs) -> Result<()> {
    let client = DaemonClient::for_action()?;
    let stream = client.open().await?;
    let (mut reader, mut writer) = stream.into_split();

    let register = Request::Register {
        registration: args.registration(),
    };
    protocol::write_frame(&mut writer, &register, timeout_ipc()).await?;
    match protocol::read_frame::<Response, _>(&mut reader, timeout_ipc()).await? {
        Response::Registered => {}
        Response::Error { message } => bail!("{}", message),
        other => bail!("unexpected response to register: {:?}", other),
    }
    eprintln!("worker {} registered", args.name);

    let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMessage>();
    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if protocol::write_frame(&mut writer, &message, timeout_ipc())
                .await
                .is_err()
            {
                break;
            }
        }
    });

    if args.heartbeat_ms > 0 {
        let tx = tx.clone();
        let period = Duration::from_millis(args.heartbeat_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(WorkerMessage::Heartbeat).is_err() {
                    break;
                }
            }
        });
    }

    let result = tokio::select! {
        result = serve(&mut reader, &tx, args.fail, &args.name) => result,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    writer_task.abort();
    eprintln!("worker {} disconnected", args.name);
    result
}

async fn serve(
    reader: &mut OwnedReadHalf,
    tx: &mpsc::UnboundedSender<WorkerMessage>,
    fail: bool,
    name: &str,
) -> Result<()> {
    loop {
        let bytes = match protocol::read_message(reader).await {
            Ok(bytes) => bytes,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(anyhow!(e)),
        };
        let message: ServerMessage = protocol::decode(&bytes)?;
        if let Some(reply) = answer(message, fail, name) {
            if tx.send(reply).is_err() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
