#![forbid(unsafe_code)]

use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Inner;
use crate::config::FAILURE_THRESHOLD;
use crate::hooks::HealReason;
use crate::node::NodeHandle;

impl Inner {
    pub(super) async fn tick(&self, token: &CancellationToken) {
        let Some(node) = self.current() else {
            return;
        };

        let stale = self.activity.elapsed() > self.config.stale_after;

        let failures = if self.probe(&node).await {
            self.activity.touch();
            self.failures.store(0, Ordering::SeqCst);
            0
        } else {
            self.failures.fetch_add(1, Ordering::SeqCst) + 1
        };

        if token.is_cancelled() {
            return;
        }

        let reason = if stale {
            Some(HealReason::Inactivity)
        } else if failures >= FAILURE_THRESHOLD {
            Some(HealReason::HeartbeatFailures)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.heal(reason, token).await;
        }
    }

    /// Ping the node's own participant id. A probe that outlives the
    /// timeout keeps running detached; its result is dropped.
    async fn probe(&self, node: &NodeHandle) -> bool {
        let participant = node.participant_id();
        let probe_node = node.clone();
        let probe = tokio::spawn(async move { probe_node.ping(&participant).await });

        match tokio::time::timeout(self.config.heartbeat_timeout, probe).await {
            Ok(Ok(Ok(true))) => true,
            Ok(Ok(Ok(false))) => {
                debug!("Heartbeat probe answered negatively");
                false
            }
            Ok(Ok(Err(e))) => {
                debug!(error = %e, "Heartbeat probe failed");
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Heartbeat probe task failed");
                false
            }
            Err(_) => {
                debug!(
                    timeout_secs = self.config.heartbeat_timeout.as_secs(),
                    "Heartbeat probe timed out"
                );
                false
            }
        }
    }
}
