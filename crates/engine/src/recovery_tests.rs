// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::coordinator::reserve;
use crate::planner::Placement;
use drts_core::test_support::{caps, registration};
use drts_core::{JobId, JobOutcome, Requirements, WorkerAck};
use serde_json::json;

fn running_job(workers: &[&str], reassignable: bool) -> AgentState {
    let mut state = AgentState::new(1);
    for name in workers {
        state
            .registry
            .register(registration(name, &[]), 0)
            .unwrap();
    }
    state
        .store
        .submit(
            JobId::new("j1"),
            Requirements::new(caps(&[]))
                .with_degree(workers.len() as u32)
                .reassignable(reassignable),
            json!(null),
            0,
        )
        .unwrap();
    reserve(
        &mut state.registry,
        &mut state.store,
        Placement {
            job_id: JobId::new("j1"),
            workers: workers.iter().map(|w| WorkerName::new(*w)).collect(),
        },
        None,
    )
    .unwrap();
    state
}

fn lose(state: &mut AgentState, worker: &str, policy: LossPolicy) -> Vec<Effect> {
    let worker = WorkerName::new(worker);
    state.registry.mark_lost(&worker, 0).unwrap();
    apply_loss(state, &worker, policy)
}

fn j1() -> JobId {
    JobId::new("j1")
}

#[test]
fn loss_without_redundancy_fails_job_and_cancels_survivor() {
    let mut state = running_job(&["w1", "w2"], false);
    let effects = lose(&mut state, "w1", LossPolicy::Fail);

    let job = state.store.get(&j1()).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert!(matches!(
        &job.outcome,
        Some(JobOutcome::Failed { worker: Some(w), .. }) if w == "w1"
    ));
    assert!(effects.contains(&Effect::Cancel {
        job_id: j1(),
        worker: WorkerName::new("w2"),
    }));
    assert!(state.registry.assignments(&WorkerName::new("w1")).is_empty());
    // Survivor drains until it answers.
    assert_eq!(state.registry.assignments(&WorkerName::new("w2")), vec![j1()]);
}

#[test]
fn requeue_policy_returns_job_to_pending() {
    let mut state = running_job(&["w1", "w2"], false);
    let effects = lose(&mut state, "w2", LossPolicy::Requeue);

    let job = state.store.get(&j1()).unwrap();
    assert_eq!(job.state, JobState::Pending);
    assert!(job.assigned.is_empty());
    assert!(job.draining.contains(&WorkerName::new("w1")));
    assert!(effects.contains(&Effect::Cancel {
        job_id: j1(),
        worker: WorkerName::new("w1"),
    }));
}

#[test]
fn reassignable_job_requeues_under_fail_policy() {
    let mut state = running_job(&["w1"], true);
    lose(&mut state, "w1", LossPolicy::Fail);
    assert_eq!(state.store.state(&j1()), Some(JobState::Pending));
    assert!(state.registry.assignments(&WorkerName::new("w1")).is_empty());
}

#[test]
fn loss_releases_draining_slot() {
    let mut state = running_job(&["w1", "w2"], false);
    state
        .store
        .transition(
            &j1(),
            drts_core::JobTransition::Ack {
                worker: WorkerName::new("w1"),
                ack: WorkerAck::Failed {
                    cause: "boom".into(),
                },
            },
        )
        .unwrap();
    state.registry.release(&WorkerName::new("w1"), &j1());

    lose(&mut state, "w2", LossPolicy::Fail);
    assert!(state.registry.assignments(&WorkerName::new("w2")).is_empty());
    assert!(state.store.get(&j1()).unwrap().draining.is_empty());
}

#[test]
fn outstanding_work_tracks_held_slots() {
    let mut state = running_job(&["w1"], false);
    let w1 = WorkerName::new("w1");
    assert!(has_outstanding_work(&state, &w1));
    lose(&mut state, "w1", LossPolicy::Fail);
    assert!(!has_outstanding_work(&state, &w1));
}

#[test]
fn resume_running_job_sends_nothing() {
    let mut state = running_job(&["w1"], false);
    let w1 = WorkerName::new("w1");
    state.registry.mark_lost(&w1, 0).unwrap();
    state.registry.register(registration("w1", &[]), 1).unwrap();

    assert!(resume(&state, &w1).is_empty());
    assert_eq!(state.store.state(&j1()), Some(JobState::Running));
}

#[test]
fn resume_replays_cancel_for_canceling_job() {
    let mut state = running_job(&["w1"], false);
    let w1 = WorkerName::new("w1");
    state.registry.mark_lost(&w1, 0).unwrap();
    state.store.transition(&j1(), drts_core::JobTransition::Cancel).unwrap();
    state.registry.register(registration("w1", &[]), 1).unwrap();

    assert_eq!(
        resume(&state, &w1),
        vec![Effect::Cancel {
            job_id: j1(),
            worker: w1
        }]
    );
}
