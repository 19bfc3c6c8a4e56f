#![forbid(unsafe_code)]

use std::future::Future;
use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::Inner;
use crate::error::{Result, SupervisorError};
use crate::hooks::{HealOutcome, HealReason, NodeReplacement, RepairStep, SupervisorEvent};
use crate::node::NodeHandle;

impl Inner {
    pub(super) async fn heal(&self, reason: HealReason, token: &CancellationToken) -> HealOutcome {
        info!(reason = %reason, "Healing relay connection");
        self.hooks.heal_started(reason);
        self.emit(SupervisorEvent::HealStarted { reason });

        let outcome = self.run_ladder(reason, token).await;
        self.hooks.heal_finished(outcome);
        outcome
    }

    async fn run_ladder(&self, reason: HealReason, token: &CancellationToken) -> HealOutcome {
        let mut attempts = 0;
        for (attempt, delay) in self.config.backoff_schedule().enumerate() {
            if attempt > 0 && !delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return HealOutcome::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if token.is_cancelled() {
                return HealOutcome::Cancelled;
            }
            let Some(node) = self.current() else {
                return HealOutcome::Cancelled;
            };
            attempts += 1;

            match self.bounded(RepairStep::Resubscribe, node.resubscribe()).await {
                Ok(()) => return self.repaired(RepairStep::Resubscribe),
                Err(e) => debug!(attempt, error = %e, "Resubscribe failed"),
            }
            if token.is_cancelled() {
                return HealOutcome::Cancelled;
            }

            match self.bounded(RepairStep::Reconnect, node.reconnect()).await {
                Ok(()) => return self.repaired(RepairStep::Reconnect),
                Err(e) => debug!(attempt, error = %e, "Reconnect failed"),
            }
            if token.is_cancelled() {
                return HealOutcome::Cancelled;
            }

            let created = self
                .bounded(
                    RepairStep::Recreate,
                    self.factory.create(&self.credentials, &self.relays),
                )
                .await;
            match created {
                Ok(next) => {
                    if !self.replace(next, node, token) {
                        return HealOutcome::Cancelled;
                    }
                    return self.repaired(RepairStep::Recreate);
                }
                Err(e) => warn!(attempt, error = %e, "Node recreation failed"),
            }
        }

        error!(
            reason = %reason,
            attempts,
            "Connection heal exhausted, retrying on next heartbeat"
        );
        self.emit(SupervisorEvent::HealExhausted { reason });
        HealOutcome::Exhausted
    }

    /// Run one repair step, failing it once `repair_timeout` elapses.
    async fn bounded<T>(
        &self,
        step: RepairStep,
        repair: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let limit = self.config.repair_timeout;
        tokio::time::timeout(limit, repair).await.map_err(|_| {
            SupervisorError::Timeout(format!("{step} did not finish within {}s", limit.as_secs()))
        })?
    }

    fn repaired(&self, step: RepairStep) -> HealOutcome {
        self.failures.store(0, Ordering::SeqCst);
        self.activity.touch();
        info!(step = %step, "Relay connection repaired");
        self.emit(SupervisorEvent::Repaired { step });
        HealOutcome::Repaired(step)
    }

    /// Swap in `next` and tell the owner in the same step.
    ///
    /// Returns `false`, leaving the current node untouched, when the run was
    /// cancelled before the swap.
    fn replace(&self, next: NodeHandle, previous: NodeHandle, token: &CancellationToken) -> bool {
        let _swap = self.swap.lock();
        if token.is_cancelled() {
            debug!(next = %next.participant_id(), "Discarding node created after stop");
            return false;
        }

        *self.node.write() = Some(next.clone());
        self.attach(&next, token);
        info!(
            previous = %previous.participant_id(),
            next = %next.participant_id(),
            "Signing node replaced"
        );
        self.hooks.node_replaced(&NodeReplacement { next, previous });
        self.emit(SupervisorEvent::NodeReplaced);
        true
    }
}
