// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::time::Duration;

use crate::error::{Result, SupervisorError};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);
pub const DEFAULT_REPAIR_TIMEOUT: Duration = Duration::from_secs(30);

/// Consecutive failed probes that trigger a heal.
pub const FAILURE_THRESHOLD: u32 = 2;

/// Delay before each rung of a heal sequence. The first rung runs at once.
pub const HEAL_BACKOFF: [Duration; 5] = [
    Duration::ZERO,
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    /// Inbound silence after which the connection counts as stale.
    pub stale_after: Duration,
    pub max_backoff: Duration,
    /// Upper bound on a single resubscribe, reconnect or recreate attempt.
    pub repair_timeout: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            stale_after: DEFAULT_STALE_AFTER,
            max_backoff: DEFAULT_MAX_BACKOFF,
            repair_timeout: DEFAULT_REPAIR_TIMEOUT,
        }
    }
}

impl SupervisorConfig {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn with_repair_timeout(mut self, timeout: Duration) -> Self {
        self.repair_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("heartbeat_interval", self.heartbeat_interval),
            ("heartbeat_timeout", self.heartbeat_timeout),
            ("stale_after", self.stale_after),
            ("repair_timeout", self.repair_timeout),
        ] {
            if value.is_zero() {
                return Err(SupervisorError::Config(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }

    /// The heal ladder delays, each capped at `max_backoff`.
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        HEAL_BACKOFF.iter().map(|d| (*d).min(self.max_backoff))
    }
}
