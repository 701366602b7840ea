// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::client_lifecycle::log_connection_error;
use crate::daemon_process::{
    cleanup_stale_socket, daemon_dir, daemon_socket, probe_socket, read_startup_error,
    start_daemon_background, stop_daemon_sync, wrap_with_startup_error,
};

use drts_core::{Job, Requirements};
use drts_daemon::protocol::{self, ProtocolError};
use drts_daemon::{JobSummary, Request, Response, WorkerSummary};
use thiserror::Error;
use tokio::net::UnixStream;

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

/// Daemon status as reported by `Info`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonInfo {
    pub uptime_secs: u64,
    pub jobs_active: usize,
    pub workers_live: usize,
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For commands that change state: start the daemon if needed, at most one restart per process.
    pub fn for_action() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect();
        }

        let version_path = daemon_dir()?.join("daemon.version");
        if let Ok(daemon_version) = std::fs::read_to_string(&version_path) {
            let cli_version = env!("CARGO_PKG_VERSION");
            if daemon_version.trim() != cli_version {
                RESTARTED.store(true, Ordering::SeqCst);
                eprintln!(
                    "warn: daemon version {} does not match cli version {}, restarting daemon",
                    daemon_version.trim(),
                    cli_version
                );
                stop_daemon_sync();
            }
        }

        Self::connect_or_start()
    }

    /// For read-only commands: connect only, never start a daemon
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// Connect to daemon, auto-starting if not running
    pub fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                // The socket file may outlive a crashed daemon
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;

        if !socket_path.exists() {
            let err = ClientError::DaemonNotRunning;
            log_connection_error(&err);
            return Err(err);
        }

        Ok(Self { socket_path })
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // An early exit means startup failed; its reason is in the log
            if let Ok(Some(status)) = child.try_wait() {
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect() {
                Ok(client) if probe_socket(&client.socket_path) => return Ok(client),
                Ok(_) | Err(ClientError::DaemonNotRunning) => {
                    std::thread::sleep(poll_interval());
                }
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    /// Send a request and receive a response within `timeout`
    async fn send_with_timeout(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        protocol::write_frame(&mut writer, request, timeout_ipc()).await?;
        let response = protocol::read_frame(&mut reader, timeout).await?;
        Ok(response)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_logged(request, timeout_ipc()).await
    }

    async fn send_logged(
        &self,
        request: &Request,
        timeout: Duration,
    ) -> Result<Response, ClientError> {
        match self.send_with_timeout(request, timeout).await {
            Ok(Response::Error { message }) => Err(ClientError::Rejected(message)),
            Ok(response) => Ok(response),
            Err(e) => {
                log_connection_error(&e);
                Err(e)
            }
        }
    }

    pub async fn submit(
        &self,
        id: Option<String>,
        requirements: Requirements,
        payload: serde_json::Value,
    ) -> Result<String, ClientError> {
        let request = Request::Submit {
            id,
            requirements,
            payload,
        };
        match self.send(&request).await? {
            Response::Submitted { id } => Ok(id),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn job(&self, id: &str) -> Result<Job, ClientError> {
        let request = Request::Status { id: id.to_string() };
        expect_job(self.send(&request).await?)
    }

    /// Block until the job is terminal. `None` waits indefinitely.
    pub async fn wait(&self, id: &str, timeout: Option<Duration>) -> Result<Job, ClientError> {
        let request = Request::Wait {
            id: id.to_string(),
            timeout_ms: timeout.map(|t| t.as_millis() as u64),
        };
        // The daemon enforces the wait limit; give it a little room to answer
        let read_timeout = timeout
            .map(|t| t + timeout_ipc())
            .unwrap_or(Duration::from_secs(u32::MAX as u64));
        expect_job(self.send_logged(&request, read_timeout).await?)
    }

    pub async fn cancel(&self, id: &str) -> Result<(), ClientError> {
        let request = Request::Cancel { id: id.to_string() };
        match self.send(&request).await? {
            Response::Ok => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Collect a terminal job, returning its final record
    pub async fn cleanup(&self, id: &str) -> Result<Job, ClientError> {
        let request = Request::Cleanup { id: id.to_string() };
        expect_job(self.send(&request).await?)
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>, ClientError> {
        match self.send(&Request::ListJobs).await? {
            Response::Jobs { jobs } => Ok(jobs),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn list_workers(&self) -> Result<Vec<WorkerSummary>, ClientError> {
        match self.send(&Request::ListWorkers).await? {
            Response::Workers { workers } => Ok(workers),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn info(&self) -> Result<DaemonInfo, ClientError> {
        match self.send(&Request::Info).await? {
            Response::Info {
                uptime_secs,
                jobs_active,
                workers_live,
            } => Ok(DaemonInfo {
                uptime_secs,
                jobs_active,
                workers_live,
            }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Open a raw connection, used by worker sessions
    pub async fn open(&self) -> Result<UnixStream, ClientError> {
        Ok(UnixStream::connect(&self.socket_path).await?)
    }
}

fn expect_job(response: Response) -> Result<Job, ClientError> {
    match response {
        Response::Job { job } => Ok(*job),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
