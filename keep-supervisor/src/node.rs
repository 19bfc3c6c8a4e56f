// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use zeroize::Zeroizing;

use crate::error::Result;

/// Events published by a signing node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeEvent {
    /// An inbound message arrived from a relay.
    Message,
    /// The node finished connecting and is ready to sign.
    Ready,
    /// The relay transport under the node reported a disconnect.
    TransportClosed { reason: Option<String> },
    /// The node is disconnected, whichever layer noticed first.
    Closed,
}

/// Capabilities the supervisor needs from a live signing node.
///
/// Implementations wrap the FROST node and its relay client. Every method
/// may be called from the supervisor task while other tasks use the node.
#[async_trait]
pub trait SigningNode: Send + Sync {
    /// Identifier this node answers pings for.
    fn participant_id(&self) -> String;

    /// Liveness probe. `Ok(false)` is an explicit negative answer.
    async fn ping(&self, participant: &str) -> Result<bool>;

    fn subscribe(&self) -> broadcast::Receiver<NodeEvent>;

    /// Publish `event` to every subscriber of this node.
    fn emit(&self, event: NodeEvent);

    /// Re-issue the relay subscription filters.
    async fn resubscribe(&self) -> Result<()>;

    /// Drop and re-establish the relay connections.
    async fn reconnect(&self) -> Result<()>;
}

pub type NodeHandle = Arc<dyn SigningNode>;

/// Credentials a node is built from.
#[derive(Clone)]
pub struct NodeCredentials {
    pub group: String,
    pub share: Zeroizing<String>,
}

impl NodeCredentials {
    pub fn new(group: &str, share: &str) -> Self {
        Self {
            group: group.to_string(),
            share: Zeroizing::new(share.to_string()),
        }
    }
}

impl std::fmt::Debug for NodeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCredentials")
            .field("group", &self.group)
            .field("share", &"[REDACTED]")
            .finish()
    }
}

/// Builds a fresh node from credentials and a relay list.
#[async_trait]
pub trait NodeFactory: Send + Sync {
    async fn create(&self, credentials: &NodeCredentials, relays: &[String]) -> Result<NodeHandle>;
}
