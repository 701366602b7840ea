// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! drts - client for the drts scheduling agent

mod client;
mod client_lifecycle;
mod commands;
mod daemon_process;
mod env;
mod output;
mod table;

use output::OutputFormat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, job, worker};

#[derive(Parser)]
#[command(
    name = "drts",
    version,
    about = "drts - coallocating job scheduler for capability-tagged workers"
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job
    Submit(job::SubmitArgs),
    /// Show a job
    Status {
        /// Job id
        id: String,
    },
    /// Block until a job finishes, fails or is canceled
    Wait {
        /// Job id
        id: String,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Cancel a job
    Cancel {
        /// Job id
        id: String,
    },
    /// Collect a terminal job and remove it from the daemon
    Cleanup {
        /// Job id
        id: String,
    },
    /// List jobs
    Jobs,
    /// List registered workers
    Workers,
    /// Run a minimal worker that answers every dispatch
    Worker(worker::WorkerArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", format_error(&e));
        std::process::exit(1);
    }
}

/// Render an anyhow error, skipping causes already present in the top message.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Submit(args) => job::submit(args, format).await,
        Commands::Status { id } => job::status(id, format).await,
        Commands::Wait { id, timeout_ms } => job::wait(id, timeout_ms, format).await,
        Commands::Cancel { id } => job::cancel(id, format).await,
        Commands::Cleanup { id } => job::cleanup(id, format).await,
        Commands::Jobs => job::list(format).await,
        Commands::Workers => worker::list(format).await,
        Commands::Worker(args) => worker::run(args).await,
        Commands::Daemon(args) => daemon::daemon(args, format).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
