// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-runtime invariants under arbitrary event interleavings

use super::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    Register(u8),
    Lose(u8),
    Submit(u32),
    Finish(u8, u8),
    Fail(u8, u8),
    CancelAck(u8, u8),
    Cancel(u8),
    Collect(u8),
    Tick,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4).prop_map(Op::Register),
        (0u8..4).prop_map(Op::Lose),
        (1u32..=3).prop_map(Op::Submit),
        (0u8..6, 0u8..4).prop_map(|(j, w)| Op::Finish(j, w)),
        (0u8..6, 0u8..4).prop_map(|(j, w)| Op::Fail(j, w)),
        (0u8..6, 0u8..4).prop_map(|(j, w)| Op::CancelAck(j, w)),
        (0u8..6).prop_map(Op::Cancel),
        (0u8..6).prop_map(Op::Collect),
        Just(Op::Tick),
    ]
}

fn allowed(from: JobState, to: JobState) -> bool {
    use JobState::*;
    matches!(
        (from, to),
        (Pending, Running)
            | (Pending, Canceled)
            | (Running, Finished)
            | (Running, Failed)
            | (Running, Canceling)
            | (Running, Pending)
            | (Canceling, Canceled)
            | (Canceling, Failed)
    )
}

fn to_event(op: &Op, submitted: &mut u32) -> Event {
    let job = |j: &u8| format!("j{j}");
    let worker = |w: &u8| format!("w{w}");
    match op {
        Op::Register(w) => register_event(&worker(w), &[]),
        Op::Lose(w) => lost_event(&worker(w)),
        Op::Submit(degree) => {
            let id = format!("j{}", *submitted % 6);
            *submitted += 1;
            submit_event(&id, &[], *degree)
        }
        Op::Finish(j, w) => finished_event(&job(j), &worker(w)),
        Op::Fail(j, w) => failed_event(&job(j), &worker(w), "boom"),
        Op::CancelAck(j, w) => cancel_ack_event(&job(j), &worker(w)),
        Op::Cancel(j) => cancel_event(&job(j)),
        Op::Collect(j) => collect_event(&job(j)),
        Op::Tick => Event::Shutdown,
    }
}

fn check_invariants(ctx: &TestContext) -> Result<(), TestCaseError> {
    let jobs = ctx.runtime.jobs();
    for job in &jobs {
        let assigned = job.assigned.len();
        prop_assert!(
            assigned == 0 || assigned == job.degree() as usize,
            "job {} has {} of {} workers",
            job.id,
            assigned,
            job.degree()
        );
        for pair in job.history.windows(2) {
            prop_assert!(allowed(pair[0], pair[1]), "invalid path {:?}", job.history);
        }
    }

    let ids: BTreeSet<&JobId> = jobs.iter().map(|j| &j.id).collect();
    for worker in ctx.runtime.workers() {
        prop_assert!(worker.load() <= worker.slots as usize);
        for id in &worker.assignments {
            prop_assert!(ids.contains(id), "{} holds collected job {}", worker.name, id);
        }
        for job in &jobs {
            prop_assert_eq!(
                worker.assignments.contains(&job.id),
                job.holds(&worker.name),
                "registry and job {} disagree about {}",
                job.id,
                worker.name
            );
        }
    }
    Ok(())
}

fn run_case(config: RuntimeConfig, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    rt.block_on(async {
        let ctx = setup_with(config);
        let mut submitted = 0;
        for op in &ops {
            let before: Vec<(JobId, JobState)> =
                ctx.runtime.jobs().into_iter().map(|j| (j.id, j.state)).collect();
            if let Op::Tick = op {
                ctx.advance(Duration::from_secs(20)).await;
            } else if ctx.process(to_event(op, &mut submitted)).await.is_err() {
                // Rejected events leave every job where it was.
                for (id, state) in &before {
                    if let Some(job) = ctx.runtime.job(id) {
                        prop_assert_eq!(job.state, *state);
                    }
                }
            }
            for (id, state) in &before {
                if state.is_terminal() {
                    if let Some(job) = ctx.runtime.job(id) {
                        prop_assert_eq!(job.state, *state, "left a terminal state");
                    }
                }
            }
            check_invariants(&ctx)?;
        }
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn registry_and_jobs_stay_consistent(ops in prop::collection::vec(arb_op(), 0..60)) {
        run_case(RuntimeConfig::default(), ops)?;
    }

    #[test]
    fn consistency_holds_with_requeue_and_rejoin(ops in prop::collection::vec(arb_op(), 0..60)) {
        run_case(
            RuntimeConfig {
                loss_policy: LossPolicy::Requeue,
                rejoin_grace: Some(Duration::from_secs(30)),
                ack_timeout: Some(Duration::from_secs(50)),
                default_slots: 2,
                ..RuntimeConfig::default()
            },
            ops,
        )?;
    }
}
