// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker event handling

use super::super::Runtime;
use crate::error::RuntimeError;
use crate::recovery;
use crate::registry::Registered;
use drts_adapters::WorkerAdapter;
use drts_core::{Clock, Effect, Event, Registration, TimerId, WorkerName};

impl<W, C> Runtime<W, C>
where
    W: WorkerAdapter,
    C: Clock,
{
    pub(crate) async fn handle_register(
        &self,
        registration: Registration,
    ) -> Result<Vec<Event>, RuntimeError> {
        let effects = self.mutate(|state, config, now_ms| {
            let name = registration.name.clone();
            let outcome = state.registry.register(registration, now_ms)?;

            let mut effects = Vec::new();
            if let Some(duration) = config.heartbeat_timeout {
                effects.push(Effect::SetTimer {
                    id: TimerId::heartbeat(&name),
                    duration,
                });
            }
            match outcome {
                Registered::New => tracing::info!(worker = %name, "worker registered"),
                Registered::Rejoined => {
                    tracing::info!(worker = %name, "lost worker rejoined");
                    effects.push(Effect::CancelTimer {
                        id: TimerId::rejoin(&name),
                    });
                    effects.extend(recovery::resume(state, &name));
                }
            }
            Ok(effects)
        })?;
        Ok(self.run(effects).await)
    }

    pub(crate) async fn handle_heartbeat(
        &self,
        name: &WorkerName,
    ) -> Result<Vec<Event>, RuntimeError> {
        let effects = self.mutate(|state, config, _| {
            state.registry.require_live(name)?;
            Ok(config
                .heartbeat_timeout
                .map(|duration| Effect::SetTimer {
                    id: TimerId::heartbeat(name),
                    duration,
                })
                .into_iter()
                .collect())
        })?;
        Ok(self.run(effects).await)
    }

    pub(crate) async fn handle_worker_lost(
        &self,
        name: &WorkerName,
        reason: &str,
    ) -> Result<Vec<Event>, RuntimeError> {
        let effects = self.mutate(|state, config, now_ms| {
            if !state.registry.mark_lost(name, now_ms)? {
                tracing::debug!(worker = %name, reason, "worker already lost");
                return Ok(vec![]);
            }
            tracing::warn!(worker = %name, reason, "worker lost");

            let mut effects = vec![Effect::CancelTimer {
                id: TimerId::heartbeat(name),
            }];
            match config.rejoin_grace {
                Some(duration) if recovery::has_outstanding_work(state, name) => {
                    tracing::info!(
                        worker = %name,
                        grace_ms = duration.as_millis() as u64,
                        "holding jobs for rejoin"
                    );
                    effects.push(Effect::SetTimer {
                        id: TimerId::rejoin(name),
                        duration,
                    });
                }
                _ => effects.extend(recovery::apply_loss(state, name, config.loss_policy)),
            }
            Ok(effects)
        })?;
        Ok(self.run(effects).await)
    }
}
