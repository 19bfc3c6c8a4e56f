// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{RelayError, Result};

/// Environment variable holding the single operator override relay.
pub const ENV_RELAY_VAR: &str = "KEEP_RELAY";

const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Source of locally configured relay overrides.
///
/// Implementations never fail: anything missing or unreadable is reported
/// as no override.
pub trait RelaySettings: Send + Sync {
    /// Operator override relay, highest precedence when present.
    fn env_relay(&self) -> Option<String>;

    /// Relay list from the local override file.
    fn override_relays(&self) -> Option<Vec<String>>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelayFile {
    #[serde(default)]
    relays: Vec<String>,
}

/// Reads `relays.toml` and the `KEEP_RELAY` environment variable.
#[derive(Clone, Debug)]
pub struct FileRelaySettings {
    path: Option<PathBuf>,
    env_var: String,
}

impl FileRelaySettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            env_var: ENV_RELAY_VAR.into(),
        }
    }

    /// Uses `<config_dir>/keep/relays.toml`.
    pub fn from_default_path() -> Self {
        Self {
            path: Self::default_path(),
            env_var: ENV_RELAY_VAR.into(),
        }
    }

    pub fn with_env_var(mut self, name: &str) -> Self {
        self.env_var = name.into();
        self
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keep").join("relays.toml"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load(path: &Path) -> Result<Vec<String>> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(RelayError::Config("Relay override file too large".into()));
        }
        let content = std::fs::read_to_string(path)?;
        parse_relay_file(&content)
    }
}

impl RelaySettings for FileRelaySettings {
    fn env_relay(&self) -> Option<String> {
        std::env::var(&self.env_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    fn override_relays(&self) -> Option<Vec<String>> {
        let path = self.path.as_deref()?;
        if !path.exists() {
            return None;
        }
        match Self::load(path) {
            Ok(relays) => Some(relays),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring relay override file");
                None
            }
        }
    }
}

pub fn parse_relay_file(content: &str) -> Result<Vec<String>> {
    toml::from_str::<RelayFile>(content)
        .map(|f| f.relays)
        .map_err(|e| RelayError::Config(format!("Invalid relay override file: {e}")))
}

/// Fixed settings, for tests and embedders that manage configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticRelaySettings {
    pub env_relay: Option<String>,
    pub override_relays: Option<Vec<String>>,
}

impl StaticRelaySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env_relay(mut self, relay: &str) -> Self {
        self.env_relay = Some(relay.into());
        self
    }

    pub fn with_override_relays(mut self, relays: Vec<String>) -> Self {
        self.override_relays = Some(relays);
        self
    }
}

impl RelaySettings for StaticRelaySettings {
    fn env_relay(&self) -> Option<String> {
        self.env_relay.clone()
    }

    fn override_relays(&self) -> Option<Vec<String>> {
        self.override_relays.clone()
    }
}
