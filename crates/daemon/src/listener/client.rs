// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client request handlers.

use std::time::Duration;

use drts_core::{Event, IdGen, JobId};
use tokio::sync::broadcast::error::RecvError;

use super::{ConnectionError, ListenCtx};
use crate::event_bus::Reply;
use crate::lifecycle::DaemonRuntime;
use crate::protocol::{JobSummary, Request, Response, WorkerSummary, PROTOCOL_VERSION};

pub(super) async fn handle_request(
    request: Request,
    ctx: &ListenCtx,
) -> Result<Response, ConnectionError> {
    let response = match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Submit {
            id,
            requirements,
            payload,
        } => {
            let id = id.unwrap_or_else(|| ctx.ids.next());
            let event = Event::JobSubmit {
                id: JobId::new(&id),
                requirements,
                payload,
            };
            match ctx.event_bus.request(event).await? {
                Reply::Rejected(message) => Response::Error { message },
                _ => Response::Submitted { id },
            }
        }

        Request::Status { id } => match ctx.runtime.job(&JobId::new(&id)) {
            Some(job) => Response::Job { job: Box::new(job) },
            None => unknown_job(&id),
        },

        Request::Wait { id, timeout_ms } => {
            wait_for_terminal(&ctx.runtime, JobId::new(id), timeout_ms.map(Duration::from_millis))
                .await
        }

        Request::Cancel { id } => {
            let event = Event::JobCancel { id: JobId::new(id) };
            match ctx.event_bus.request(event).await? {
                Reply::Rejected(message) => Response::Error { message },
                _ => Response::Ok,
            }
        }

        Request::Cleanup { id } => {
            let event = Event::JobCollect { id: JobId::new(id) };
            match ctx.event_bus.request(event).await? {
                Reply::Collected(job) => Response::Job { job },
                Reply::Rejected(message) => Response::Error { message },
                Reply::Ok => Response::Ok,
            }
        }

        Request::ListJobs => Response::Jobs {
            jobs: ctx.runtime.jobs().iter().map(JobSummary::from).collect(),
        },

        Request::ListWorkers => Response::Workers {
            workers: ctx.runtime.workers().iter().map(WorkerSummary::from).collect(),
        },

        Request::Info => Response::Info {
            uptime_secs: ctx.start_time.elapsed().as_secs(),
            jobs_active: ctx
                .runtime
                .jobs()
                .iter()
                .filter(|job| !job.is_terminal())
                .count(),
            workers_live: ctx.runtime.workers().iter().filter(|w| !w.lost).count(),
        },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }

        Request::Register { .. } => Response::Error {
            message: "register must be the first frame of a connection".to_string(),
        },
    };
    Ok(response)
}

fn unknown_job(id: &str) -> Response {
    Response::Error {
        message: format!("unknown job: {id}"),
    }
}

/// Resolve once the job is terminal, or fail after `timeout`.
async fn wait_for_terminal(
    runtime: &DaemonRuntime,
    id: JobId,
    timeout: Option<Duration>,
) -> Response {
    // Subscribe before the first read so no transition slips between them
    let mut updates = runtime.subscribe();

    let wait = async {
        loop {
            match runtime.job(&id) {
                None => return unknown_job(id.as_str()),
                Some(job) if job.is_terminal() => return Response::Job { job: Box::new(job) },
                Some(_) => {}
            }
            loop {
                match updates.recv().await {
                    Ok(update) if update.id == id && update.state.is_terminal() => break,
                    Ok(_) => continue,
                    // Missed updates; re-read the record
                    Err(RecvError::Lagged(_)) => break,
                    Err(RecvError::Closed) => {
                        return Response::Error {
                            message: "daemon is shutting down".to_string(),
                        }
                    }
                }
            }
        }
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, wait)
            .await
            .unwrap_or_else(|_| Response::Error {
                message: format!("timed out waiting for job {id}"),
            }),
        None => wait.await,
    }
}
