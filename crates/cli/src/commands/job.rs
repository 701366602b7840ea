// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job commands: submit, status, wait, cancel, cleanup, jobs

use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;

use drts_core::{Capability, CapabilitySet, Job, JobOutcome, Requirements};

use crate::client::DaemonClient;
use crate::output::{format_time_ago, print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Required capability, NAME or NAME=VALUE (repeatable)
    #[arg(long = "capability", short = 'c')]
    pub capabilities: Vec<Capability>,

    /// Number of workers to coallocate
    #[arg(long, short = 'n', default_value_t = 1)]
    pub degree: u32,

    /// Return the job to pending instead of failing it when a worker is lost
    #[arg(long)]
    pub reassignable: bool,

    /// Opaque JSON handed to every assigned worker
    #[arg(long, value_parser = parse_payload)]
    pub payload: Option<serde_json::Value>,

    /// Job id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,
}

pub(crate) fn parse_payload(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON payload: {}", e))
}

impl SubmitArgs {
    pub fn requirements(&self) -> Requirements {
        let capabilities: CapabilitySet = self.capabilities.iter().cloned().collect();
        Requirements::new(capabilities)
            .with_degree(self.degree)
            .reassignable(self.reassignable)
    }
}

pub async fn submit(args: SubmitArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;
    let requirements = args.requirements();
    let payload = args.payload.unwrap_or(serde_json::Value::Null);
    let id = client.submit(args.id, requirements, payload).await?;

    match format {
        OutputFormat::Text => println!("{}", id),
        OutputFormat::Json => print_json(&serde_json::json!({ "id": id }))?,
    }
    Ok(())
}

pub async fn status(id: String, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let job = client.job(&id).await?;
    print_job(&job, format)
}

pub async fn wait(id: String, timeout_ms: Option<u64>, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let job = client
        .wait(&id, timeout_ms.map(Duration::from_millis))
        .await?;
    print_job(&job, format)?;

    match job.outcome {
        Some(JobOutcome::Finished { .. }) => Ok(()),
        _ => Err(anyhow!("job {} {}", job.id, job.state)),
    }
}

pub async fn cancel(id: String, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;
    client.cancel(&id).await?;

    match format {
        OutputFormat::Text => println!("Cancel requested for {}", id),
        OutputFormat::Json => print_json(&serde_json::json!({ "canceled": id }))?,
    }
    Ok(())
}

pub async fn cleanup(id: String, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_action()?;
    let job = client.cleanup(&id).await?;

    match format {
        OutputFormat::Text => println!("Collected {} ({})", job.id, job.state),
        OutputFormat::Json => print_json(&job)?,
    }
    Ok(())
}

pub async fn list(format: OutputFormat) -> Result<()> {
    let client = DaemonClient::for_query()?;
    let jobs = client.list_jobs().await?;

    match format {
        OutputFormat::Text => {
            if jobs.is_empty() {
                println!("No jobs");
                return Ok(());
            }
            let mut table = Table::new(vec![
                Column::left("ID").with_max(36),
                Column::left("STATE"),
                Column::right("DEGREE"),
                Column::right("ATTEMPTS"),
                Column::left("AGE"),
                Column::left("WORKERS"),
            ]);
            for job in &jobs {
                table.row(vec![
                    job.id.clone(),
                    job.state.to_string(),
                    job.degree.to_string(),
                    job.attempts.to_string(),
                    format_time_ago(job.submitted_at_ms),
                    job.assigned.join(","),
                ]);
            }
            table.render(&mut std::io::stdout());
        }
        OutputFormat::Json => print_json(&jobs)?,
    }
    Ok(())
}

fn print_job(job: &Job, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Job: {}", job.id);
            println!("State: {}", job.state);
            println!("Degree: {}", job.degree());
            if !job.requirements.capabilities.is_empty() {
                println!("Requires: {}", job.requirements.capabilities);
            }
            if job.attempts > 1 {
                println!("Attempts: {}", job.attempts);
            }
            if !job.assigned.is_empty() {
                let names: Vec<&str> = job.assigned.iter().map(|w| w.as_str()).collect();
                println!("Workers: {}", names.join(", "));
            }
            match &job.outcome {
                Some(JobOutcome::Finished { results }) => {
                    println!("Results: {}", serde_json::to_string(results)?);
                }
                Some(JobOutcome::Failed { cause, worker }) => match worker {
                    Some(worker) => println!("Cause: {} (worker {})", cause, worker),
                    None => println!("Cause: {}", cause),
                },
                Some(JobOutcome::Canceled) | None => {}
            }
        }
        OutputFormat::Json => print_json(job)?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
