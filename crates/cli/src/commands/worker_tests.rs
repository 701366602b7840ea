// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::Parser;
use drts_adapters::Assignment;
use drts_core::{JobId, Peer};

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    worker: WorkerArgs,
}

fn dispatch(job: &str) -> ServerMessage {
    ServerMessage::Dispatch {
        assignment: Assignment {
            job_id: JobId::new(job),
            rank: 1,
            peers: vec![
                Peer {
                    name: WorkerName::new("w1"),
                    hostname: "a".to_string(),
                },
                Peer {
                    name: WorkerName::new("w2"),
                    hostname: "b".to_string(),
                },
            ],
            payload: serde_json::Value::Null,
        },
    }
}

#[test]
fn dispatch_is_answered_with_result() {
    let reply = answer(dispatch("job-1"), false, "w2");
    assert_eq!(
        reply,
        Some(WorkerMessage::Finished {
            job_id: JobId::new("job-1"),
            result: serde_json::json!({ "worker": "w2", "rank": 1, "peers": 2 }),
        })
    );
}

#[test]
fn failing_worker_reports_failure() {
    let reply = answer(dispatch("job-1"), true, "w2");
    assert!(matches!(
        reply,
        Some(WorkerMessage::Failed { job_id, .. }) if job_id == JobId::new("job-1")
    ));
}

#[test]
fn cancel_is_acknowledged() {
    let reply = answer(
        ServerMessage::Cancel {
            job_id: JobId::new("job-2"),
        },
        false,
        "w1",
    );
    assert_eq!(
        reply,
        Some(WorkerMessage::CancelAck {
            job_id: JobId::new("job-2")
        })
    );
}

#[test]
fn rejection_needs_no_reply() {
    let reply = answer(
        ServerMessage::Rejected {
            message: "unknown job: x".to_string(),
        },
        false,
        "w1",
    );
    assert_eq!(reply, None);
}

#[test]
fn registration_carries_flags() {
    let cli = TestCli::try_parse_from([
        "drts",
        "--name",
        "w1",
        "--hostname",
        "node1",
        "-c",
        "gpu",
        "--slots",
        "3",
    ])
    .unwrap();
    let registration = cli.worker.registration();

    assert_eq!(registration.name, WorkerName::new("w1"));
    assert_eq!(registration.hostname, "node1");
    assert_eq!(registration.slots, Some(3));
    assert!(registration.capabilities.provides(&Capability::new("gpu")));
}
