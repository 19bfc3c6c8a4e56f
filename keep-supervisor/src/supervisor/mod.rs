// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

mod bridge;
mod heal;
mod heartbeat;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use keep_relay::RelayPlan;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SupervisorConfig;
use crate::error::{Result, SupervisorError};
use crate::hooks::{NoOpHooks, SupervisorEvent, SupervisorHooks};
use crate::node::{NodeCredentials, NodeFactory, NodeHandle};
use crate::task::ScheduledTask;

use bridge::ActivityClock;

const EVENT_CHANNEL_CAPACITY: usize = 64;

enum Lifecycle {
    Idle,
    Running(ScheduledTask),
    Stopped,
}

struct Inner {
    config: SupervisorConfig,
    factory: Arc<dyn NodeFactory>,
    credentials: NodeCredentials,
    relays: Vec<String>,
    hooks: Arc<dyn SupervisorHooks>,
    node: RwLock<Option<NodeHandle>>,
    /// Serializes node replacement against `stop`.
    swap: ReentrantMutex<()>,
    bridge: Mutex<Option<CancellationToken>>,
    activity: Arc<ActivityClock>,
    failures: AtomicU32,
    event_tx: broadcast::Sender<SupervisorEvent>,
}

impl Inner {
    fn current(&self) -> Option<NodeHandle> {
        self.node.read().clone()
    }

    fn emit(&self, event: SupervisorEvent) {
        let _ = self.event_tx.send(event);
    }
}

pub struct SupervisorBuilder {
    factory: Arc<dyn NodeFactory>,
    credentials: NodeCredentials,
    relays: Vec<String>,
    config: SupervisorConfig,
    hooks: Arc<dyn SupervisorHooks>,
}

impl SupervisorBuilder {
    /// Node recreation reuses `plan.relays`; the plan is never recomputed.
    pub fn new(
        factory: Arc<dyn NodeFactory>,
        credentials: NodeCredentials,
        plan: &RelayPlan,
    ) -> Self {
        Self {
            factory,
            credentials,
            relays: plan.relays.clone(),
            config: SupervisorConfig::default(),
            hooks: Arc::new(NoOpHooks),
        }
    }

    pub fn config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn SupervisorHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<ConnectionSupervisor> {
        self.config.validate()?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(ConnectionSupervisor {
            inner: Arc::new(Inner {
                config: self.config,
                factory: self.factory,
                credentials: self.credentials,
                relays: self.relays,
                hooks: self.hooks,
                node: RwLock::new(None),
                swap: ReentrantMutex::new(()),
                bridge: Mutex::new(None),
                activity: Arc::new(ActivityClock::new()),
                failures: AtomicU32::new(0),
                event_tx,
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        })
    }
}

/// Keeps a signing node connected.
///
/// Once started, the supervisor probes the node every heartbeat interval
/// and walks the heal ladder (resubscribe, reconnect, recreate) when the
/// node goes quiet or fails two probes in a row. Transport disconnects are
/// re-published on the node as [`crate::NodeEvent::Closed`].
///
/// Lifecycle is `Idle -> Running -> Stopped`; a stopped supervisor cannot be
/// restarted.
pub struct ConnectionSupervisor {
    inner: Arc<Inner>,
    lifecycle: Mutex<Lifecycle>,
}

impl ConnectionSupervisor {
    pub fn builder(
        factory: Arc<dyn NodeFactory>,
        credentials: NodeCredentials,
        plan: &RelayPlan,
    ) -> SupervisorBuilder {
        SupervisorBuilder::new(factory, credentials, plan)
    }

    /// Begin supervising `node`. The first heartbeat runs immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, node: NodeHandle) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Running(_) => return Err(SupervisorError::AlreadyStarted),
            Lifecycle::Stopped => return Err(SupervisorError::Stopped),
            Lifecycle::Idle => {}
        }

        let token = CancellationToken::new();
        *self.inner.node.write() = Some(node.clone());
        self.inner.failures.store(0, Ordering::SeqCst);
        self.inner.activity.touch();
        self.inner.attach(&node, &token);

        let inner = self.inner.clone();
        let tick_token = token.clone();
        let task = ScheduledTask::repeating(token, self.inner.config.heartbeat_interval, move || {
            let inner = inner.clone();
            let token = tick_token.clone();
            async move { inner.tick(&token).await }
        });
        *lifecycle = Lifecycle::Running(task);

        info!(
            participant = %node.participant_id(),
            relays = self.inner.relays.len(),
            interval_secs = self.inner.config.heartbeat_interval.as_secs(),
            "Connection supervisor started"
        );
        Ok(())
    }

    /// Stop supervising. Safe to call repeatedly and before `start`.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Stopped);
        let _swap = self.inner.swap.lock();
        match previous {
            Lifecycle::Stopped => return,
            Lifecycle::Running(task) => task.cancel(),
            Lifecycle::Idle => debug!("Connection supervisor stopped before start"),
        }
        self.inner.detach();
        *self.inner.node.write() = None;
        self.inner.emit(SupervisorEvent::Stopped);
        info!("Connection supervisor stopped");
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Running(_))
    }

    /// The node the supervisor currently considers live.
    pub fn current_node(&self) -> Option<NodeHandle> {
        self.inner.current()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.failures.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    pub fn relays(&self) -> &[String] {
        &self.inner.relays
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.inner.event_tx.subscribe()
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.inner.detach();
    }
}
