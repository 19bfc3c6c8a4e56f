#![forbid(unsafe_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::Inner;
use crate::node::{NodeEvent, NodeHandle};

/// Time of the last sign of life from the node.
pub(super) struct ActivityClock(Mutex<Instant>);

impl ActivityClock {
    pub(super) fn new() -> Self {
        Self(Mutex::new(Instant::now()))
    }

    pub(super) fn touch(&self) {
        *self.0.lock() = Instant::now();
    }

    pub(super) fn elapsed(&self) -> Duration {
        self.0.lock().elapsed()
    }
}

impl Inner {
    /// Listen to `node` for activity and transport closes, replacing any
    /// previous listener.
    pub(super) fn attach(&self, node: &NodeHandle, run: &CancellationToken) {
        let token = run.child_token();
        if let Some(previous) = self.bridge.lock().replace(token.clone()) {
            previous.cancel();
        }

        let mut events = node.subscribe();
        let weak = Arc::downgrade(node);
        let activity = self.activity.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(NodeEvent::Message) | Ok(NodeEvent::Ready) => activity.touch(),
                    Ok(NodeEvent::TransportClosed { reason }) => {
                        let Some(node) = weak.upgrade() else {
                            break;
                        };
                        debug!(
                            participant = %node.participant_id(),
                            reason = reason.as_deref().unwrap_or("unknown"),
                            "Relay transport closed"
                        );
                        node.emit(NodeEvent::Closed);
                    }
                    Ok(NodeEvent::Closed) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(skipped, "Node event listener lagged");
                        activity.touch();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    pub(super) fn detach(&self) {
        if let Some(token) = self.bridge.lock().take() {
            token.cancel();
        }
    }
}
