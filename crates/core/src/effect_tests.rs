// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::JobState;
use crate::traced::TracedEffect;
use serde_json::json;

#[test]
fn set_timer_serializes_duration_as_millis() {
    let effect = Effect::SetTimer {
        id: TimerId::new("heartbeat:w1"),
        duration: Duration::from_secs(2),
    };
    let json = serde_json::to_value(&effect).unwrap();
    assert_eq!(json["SetTimer"]["duration"], json!(2000));

    let back: Effect = serde_json::from_value(json).unwrap();
    assert_eq!(back, effect);
}

#[yare::parameterized(
    emit         = { Effect::Emit { event: Event::Shutdown }, "emit" },
    cancel       = { Effect::Cancel { job_id: JobId::new("j"), worker: WorkerName::new("w") }, "cancel" },
    cancel_timer = { Effect::CancelTimer { id: TimerId::new("t") }, "cancel_timer" },
    publish      = { Effect::Publish { update: JobUpdate { id: JobId::new("j"), state: JobState::Running } }, "publish" },
)]
fn effect_names(effect: Effect, expected: &str) {
    assert_eq!(effect.name(), expected);
}

#[test]
fn dispatch_fields_name_job_and_worker() {
    let effect = Effect::Dispatch {
        job_id: JobId::new("job-1"),
        worker: WorkerName::new("w2"),
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
        payload: json!({}),
    };
    let fields = effect.fields();
    assert!(fields.contains(&("job_id", "job-1".to_string())));
    assert!(fields.contains(&("worker", "w2".to_string())));
    assert!(fields.contains(&("rank", "1".to_string())));
    assert!(fields.contains(&("peers", "2".to_string())));
}
