// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! drts daemon (drtsd)
//!
//! Owns the worker registry and the job store. One listener task accepts
//! client and worker connections and turns their frames into envelopes on
//! the event bus; the engine loop below is the only place state changes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod event_bus;
mod lifecycle;
mod listener;
mod protocol;
mod sessions;

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use drts_core::UuidIdGen;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

use crate::event_bus::EventReader;
use crate::lifecycle::{Config, DaemonState, LifecycleError, StartupResult};
use crate::listener::{ListenCtx, Listener};

const USAGE: &str = "\
drts daemon - owns the worker registry and job store, places jobs on workers

USAGE:
    drtsd

Started by `drts daemon start` (or on demand by any drts command that needs
it). Clients and workers connect over daemon.sock in the state directory.

OPTIONS:
    -h, --help       Print help information
    -v, --version    Print version information";

/// Default timer resolution
const TIMER_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// First line of every startup attempt in daemon.log; the CLI scans from the
/// last one when reporting why a start failed.
pub const STARTUP_MARKER_PREFIX: &str = "--- drtsd: starting (pid: ";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => println!("drtsd {}", env!("CARGO_PKG_VERSION")),
            "--help" | "-h" | "help" => {
                println!("drtsd {}", env!("CARGO_PKG_VERSION"));
                println!("{USAGE}");
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: drtsd [--help | --version]");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let config = Config::load()?;
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!(state_dir = %config.state_dir.display(), "starting daemon");

    let StartupResult {
        mut daemon,
        listener,
        mut event_reader,
    } = match lifecycle::startup(&config).await {
        Ok(started) => started,
        Err(LifecycleError::LockFailed(_)) => {
            eprintln!("drtsd is already running");
            if let Ok(pid) = std::fs::read_to_string(&config.lock_path) {
                if !pid.trim().is_empty() {
                    eprintln!("  pid: {}", pid.trim());
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            // The non-blocking writer may not flush before exit
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let shutdown = Arc::new(Notify::new());
    let ctx = ListenCtx {
        event_bus: daemon.event_bus.clone(),
        runtime: Arc::clone(&daemon.runtime),
        sessions: daemon.sessions.clone(),
        ids: UuidIdGen,
        start_time: daemon.start_time,
        shutdown: Arc::clone(&shutdown),
    };
    tokio::spawn(Listener::new(listener, ctx).run());

    info!(socket = %config.socket_path.display(), "daemon ready");
    println!("READY");

    let reason = engine_loop(&mut daemon, &mut event_reader, &shutdown).await?;
    info!(%reason, "shutting down");

    daemon.shutdown()?;
    info!("daemon stopped");
    Ok(())
}

enum StopReason {
    BusClosed,
    Requested,
    Signal(&'static str),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BusClosed => f.write_str("event bus closed"),
            StopReason::Requested => f.write_str("shutdown requested"),
            StopReason::Signal(name) => write!(f, "received {name}"),
        }
    }
}

/// Apply envelopes one at a time and fire due timers until told to stop.
async fn engine_loop(
    daemon: &mut DaemonState,
    events: &mut EventReader,
    shutdown: &Notify,
) -> Result<StopReason, std::io::Error> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Created once: a sleep inside select! would restart on every event
    let mut timer_check = tokio::time::interval(timer_check_interval());

    loop {
        tokio::select! {
            envelope = events.recv() => match envelope {
                Some(envelope) => daemon.process(envelope).await,
                None => return Ok(StopReason::BusClosed),
            },
            _ = shutdown.notified() => return Ok(StopReason::Requested),
            _ = sigterm.recv() => return Ok(StopReason::Signal("SIGTERM")),
            _ = sigint.recv() => return Ok(StopReason::Signal("SIGINT")),
            _ = timer_check.tick() => daemon.fire_timers().await,
        }
    }
}

fn timer_check_interval() -> Duration {
    env::timer_check_ms().unwrap_or(TIMER_CHECK_INTERVAL)
}

fn append_log(config: &Config) -> std::io::Result<std::fs::File> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
}

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    let mut file = append_log(config)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

fn write_startup_error(config: &Config, error: &LifecycleError) {
    if let Ok(mut file) = append_log(config) {
        let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
    }
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = config.log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    let file_name = config.log_path.file_name().ok_or(LifecycleError::NoStateDir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
