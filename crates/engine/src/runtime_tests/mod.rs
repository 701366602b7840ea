// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests

mod cancel;
mod errors;
mod loss;
mod properties;
mod scenarios;
mod timers;
mod updates;

use super::*;
use crate::RuntimeError;
use drts_adapters::FakeWorkerAdapter;
use drts_core::test_support::*;
use drts_core::{FakeClock, JobState, WorkerName, WorkerStatus};
use std::collections::VecDeque;

type TestRuntime = Runtime<FakeWorkerAdapter, FakeClock>;

/// Test context holding the runtime and its fakes
struct TestContext {
    runtime: TestRuntime,
    clock: FakeClock,
    workers: FakeWorkerAdapter,
}

fn setup() -> TestContext {
    setup_with(RuntimeConfig::default())
}

fn setup_with(config: RuntimeConfig) -> TestContext {
    let workers = FakeWorkerAdapter::new();
    let clock = FakeClock::new();
    let runtime = Runtime::new(
        RuntimeDeps {
            workers: workers.clone(),
            state: Arc::new(Mutex::new(AgentState::new(config.default_slots))),
        },
        clock.clone(),
        config,
    );
    TestContext {
        runtime,
        clock,
        workers,
    }
}

impl TestContext {
    /// Handle an event and every event it produces, like the daemon loop does.
    async fn process(&self, event: Event) -> Result<(), RuntimeError> {
        let mut queue = VecDeque::from(self.runtime.handle_event(event).await?);
        while let Some(next) = queue.pop_front() {
            queue.extend(self.runtime.handle_event(next).await?);
        }
        Ok(())
    }

    async fn send(&self, event: Event) {
        self.process(event).await.unwrap();
    }

    /// Move the clock forward and deliver every timer that expired.
    async fn advance(&self, by: Duration) {
        self.clock.advance(by);
        let fired = self
            .runtime
            .scheduler()
            .lock()
            .fired_timers(self.clock.now());
        for event in fired {
            self.send(event).await;
        }
    }

    fn state(&self, id: &str) -> JobState {
        self.runtime.job(&JobId::new(id)).unwrap().state
    }

    fn job(&self, id: &str) -> Job {
        self.runtime.job(&JobId::new(id)).unwrap()
    }

    fn worker_status(&self, name: &str) -> WorkerStatus {
        self.runtime
            .workers()
            .into_iter()
            .find(|w| w.name == name)
            .map(|w| w.status())
            .unwrap()
    }

    /// Workers a job was dispatched to, in send order
    fn dispatched(&self, id: &str) -> Vec<String> {
        self.workers
            .dispatches(&JobId::new(id))
            .into_iter()
            .map(|(worker, _)| worker.to_string())
            .collect()
    }

    fn cancelled(&self, id: &str) -> Vec<String> {
        self.workers
            .cancels(&JobId::new(id))
            .into_iter()
            .map(|worker| worker.to_string())
            .collect()
    }
}

fn busy(jobs: &[&str]) -> WorkerStatus {
    WorkerStatus::Busy(jobs.iter().map(|j| JobId::new(*j)).collect())
}

fn name(worker: &str) -> WorkerName {
    WorkerName::new(worker)
}
