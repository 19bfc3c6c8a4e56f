// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Connection supervision for a FROST signing node.
//!
//! [`ConnectionSupervisor`] runs a heartbeat against a live [`SigningNode`]
//! and escalates through resubscribe, reconnect and full node recreation
//! when the node stops answering or goes quiet. Transport-level closes are
//! bridged into a single [`NodeEvent::Closed`] on the node.
//!
//! ```ignore
//! let supervisor = ConnectionSupervisor::builder(factory, credentials, &plan)
//!     .hooks(Arc::new(MyHooks))
//!     .build()?;
//! supervisor.start(node)?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod hooks;
pub mod node;
pub mod supervisor;
pub mod task;

pub use config::{SupervisorConfig, FAILURE_THRESHOLD, HEAL_BACKOFF};
pub use error::{Result, SupervisorError};
pub use hooks::{
    HealOutcome, HealReason, NoOpHooks, NodeReplacement, RepairStep, SupervisorEvent,
    SupervisorHooks,
};
pub use node::{NodeCredentials, NodeEvent, NodeFactory, NodeHandle, SigningNode};
pub use supervisor::{ConnectionSupervisor, SupervisorBuilder};
pub use task::ScheduledTask;
