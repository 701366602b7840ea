// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, event processing, shutdown.

mod settings;
pub use settings::Settings;

use std::collections::VecDeque;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use drts_adapters::TracedWorker;
use drts_core::{Clock, Event, SystemClock, WorkerName};
use drts_engine::{AgentState, Runtime, RuntimeDeps};
use fs2::FileExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{debug, info, warn};

use crate::env::state_dir;
use crate::event_bus::{Binding, Envelope, EventBus, EventReader, Reply};
use crate::sessions::WorkerSessions;

/// Daemon runtime with concrete adapter types
pub type DaemonRuntime = Runtime<TracedWorker<WorkerSessions>, SystemClock>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/drts)
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    /// Lock file holding the daemon's PID
    pub lock_path: PathBuf,
    pub version_path: PathBuf,
    pub log_path: PathBuf,
    /// Optional runtime settings
    pub settings_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::at(state_dir()?))
    }

    /// Fixed file layout under `state_dir`.
    pub fn at(state_dir: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            settings_path: state_dir.join("config.toml"),
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Shared with the listener for read-only queries
    pub runtime: Arc<DaemonRuntime>,
    pub sessions: WorkerSessions,
    pub event_bus: EventBus,
    pub start_time: Instant,
}

/// Result of daemon startup
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
    /// Envelope stream for the engine loop
    pub event_reader: EventReader,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Invalid settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DaemonState {
    /// Apply one envelope and answer its reply channel.
    ///
    /// Events produced along the way (failed sends, expired heartbeats) are
    /// processed before returning.
    pub async fn process(&self, envelope: Envelope) {
        let Envelope {
            event,
            reply,
            binding,
        } = envelope;
        let summary = event.log_summary();

        let mut attached = None;
        if let (Some(binding), Some(name)) = (binding, bound_name(&event)) {
            match binding {
                Binding::Attach { session, outbox } => {
                    let previous = self.sessions.attach(&name, session, outbox);
                    attached = Some((name, session, previous));
                }
                Binding::Detach { session } => {
                    if !self.sessions.detach(&name, session) {
                        debug!(worker = %name, session, "superseded session closed");
                        if let Some(reply) = reply {
                            let _ = reply.send(Reply::Ok);
                        }
                        return;
                    }
                }
            }
        }

        let (verdict, produced) = match event {
            Event::JobCollect { id } => match self.runtime.collect(&id).await {
                Ok((job, produced)) => (Reply::Collected(Box::new(job)), produced),
                Err(e) => (Reply::Rejected(e.to_string()), Vec::new()),
            },
            event => match self.runtime.handle_event(event).await {
                Ok(produced) => (Reply::Ok, produced),
                Err(e) => (Reply::Rejected(e.to_string()), Vec::new()),
            },
        };

        if let Reply::Rejected(reason) = &verdict {
            warn!(event = %summary, %reason, "event rejected");
            if let Some((name, session, previous)) = attached {
                self.sessions.restore(&name, session, previous);
            }
        }
        if let Some(reply) = reply {
            // The requester may have given up; the event is applied either way.
            let _ = reply.send(verdict);
        }

        self.feed(produced).await;
    }

    /// Fire due timers.
    pub async fn fire_timers(&self) {
        let now = self.runtime.clock().now();
        let fired = self.runtime.scheduler().lock().fired_timers(now);
        self.feed(fired).await;
    }

    /// Process events in order until none are left over.
    async fn feed(&self, events: Vec<Event>) {
        let mut pending = VecDeque::from(events);
        while let Some(event) = pending.pop_front() {
            let summary = event.log_summary();
            match self.runtime.handle_event(event).await {
                Ok(produced) => pending.extend(produced),
                Err(e) => warn!(event = %summary, error = %e, "produced event rejected"),
            }
        }
    }

    /// Shutdown the daemon gracefully.
    ///
    /// Workers keep their jobs; a restarted daemon starts with an empty registry.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        for path in [
            &self.config.socket_path,
            &self.config.lock_path,
            &self.config.version_path,
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock;
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Open without truncating so a running daemon's PID survives a failed attempt
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    let settings = Settings::load(&config.settings_path)?;
    let runtime_config = settings.runtime_config();
    info!(
        loss_policy = ?runtime_config.loss_policy,
        rejoin_grace = ?runtime_config.rejoin_grace,
        ack_timeout = ?runtime_config.ack_timeout,
        heartbeat_timeout = ?runtime_config.heartbeat_timeout,
        default_slots = runtime_config.default_slots,
        "runtime settings"
    );

    let sessions = WorkerSessions::new();
    let state = Arc::new(Mutex::new(AgentState::new(runtime_config.default_slots)));
    let runtime = Arc::new(Runtime::new(
        RuntimeDeps {
            workers: TracedWorker::new(sessions.clone()),
            state,
        },
        SystemClock,
        runtime_config,
    ));
    let (event_bus, event_reader) = EventBus::new();

    // Bind last, only after everything else succeeded
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            runtime,
            sessions,
            event_bus,
            start_time: Instant::now(),
        },
        listener,
        event_reader,
    })
}

/// Worker whose session binding an event carries.
fn bound_name(event: &Event) -> Option<WorkerName> {
    match event {
        Event::WorkerRegister { registration } => Some(registration.name.clone()),
        Event::WorkerLost { name, .. } => Some(name.clone()),
        _ => None,
    }
}

fn cleanup_on_failure(config: &Config) {
    for path in [
        &config.socket_path,
        &config.version_path,
        &config.lock_path,
    ] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../lifecycle_tests.rs"]
mod tests;
