// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::fmt;

use crate::node::NodeHandle;

/// Why a heal sequence was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealReason {
    Inactivity,
    HeartbeatFailures,
}

impl fmt::Display for HealReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealReason::Inactivity => write!(f, "inactivity"),
            HealReason::HeartbeatFailures => write!(f, "heartbeat failures"),
        }
    }
}

/// Rungs of the heal ladder, cheapest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairStep {
    Resubscribe,
    Reconnect,
    Recreate,
}

impl fmt::Display for RepairStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairStep::Resubscribe => write!(f, "resubscribe"),
            RepairStep::Reconnect => write!(f, "reconnect"),
            RepairStep::Recreate => write!(f, "recreate"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealOutcome {
    Repaired(RepairStep),
    Exhausted,
    Cancelled,
}

/// A node swap performed by the supervisor.
#[derive(Clone)]
pub struct NodeReplacement {
    pub next: NodeHandle,
    pub previous: NodeHandle,
}

impl fmt::Debug for NodeReplacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeReplacement")
            .field("next", &self.next.participant_id())
            .field("previous", &self.previous.participant_id())
            .finish()
    }
}

/// Owner callbacks invoked by the supervisor.
///
/// Callbacks run on the supervisor task and must not block. Long-running
/// work should be offloaded to a separate task.
pub trait SupervisorHooks: Send + Sync {
    /// Called once per node recreation, after the supervisor has switched to
    /// `replacement.next`. The owner swaps its own references here.
    fn node_replaced(&self, replacement: &NodeReplacement);

    fn heal_started(&self, _reason: HealReason) {}

    fn heal_finished(&self, _outcome: HealOutcome) {}
}

pub struct NoOpHooks;

impl SupervisorHooks for NoOpHooks {
    fn node_replaced(&self, _replacement: &NodeReplacement) {}
}

/// Notifications published on [`crate::ConnectionSupervisor::subscribe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupervisorEvent {
    HealStarted { reason: HealReason },
    Repaired { step: RepairStep },
    NodeReplaced,
    HealExhausted { reason: HealReason },
    Stopped,
}
