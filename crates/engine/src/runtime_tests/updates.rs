// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job update broadcast

use super::*;

#[tokio::test]
async fn every_state_change_is_published_in_order() {
    let ctx = setup();
    let mut updates = ctx.runtime.subscribe();

    ctx.send(register_event("w1", &[])).await;
    ctx.send(submit_event("j1", &[], 1)).await;
    ctx.send(cancel_event("j1")).await;
    ctx.send(cancel_ack_event("j1", "w1")).await;

    let mut states = Vec::new();
    while let Ok(update) = updates.try_recv() {
        assert_eq!(update.id, "j1");
        states.push(update.state);
    }
    assert_eq!(
        states,
        vec![
            JobState::Pending,
            JobState::Running,
            JobState::Canceling,
            JobState::Canceled
        ]
    );
}

#[tokio::test]
async fn non_transitions_publish_nothing() {
    let ctx = setup();
    ctx.send(register_event("w1", &[])).await;
    ctx.send(register_event("w2", &[])).await;
    ctx.send(submit_event("j1", &[], 2)).await;

    let mut updates = ctx.runtime.subscribe();
    ctx.send(finished_event("j1", "w1")).await;
    ctx.send(heartbeat_event("w2")).await;
    assert!(updates.try_recv().is_err());
}
