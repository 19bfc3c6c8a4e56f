// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RelayError, Result};
use crate::group::{Bech32GroupDecoder, GroupDecoder, GroupPackage};
use crate::relay_url::{canonical_key, dedupe_relays, normalize_relay_url};
use crate::settings::{FileRelaySettings, RelaySettings};
use crate::ssrf::check_group_relay;

/// Default FROST coordination relays, used when nothing overrides them.
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.primal.net/",
    "wss://relay.nsec.app/",
    "wss://relay.damus.io/",
    "wss://nos.lol/",
];

/// Last-resort relays substituted when every source comes up empty.
pub const FALLBACK_RELAYS: &[&str] = &["wss://relay.damus.io/", "wss://nos.lol/"];

/// The relays a node should connect to, with a breakdown by provenance.
///
/// Only `relays` is used for connecting. The per-source lists are kept for
/// diagnostics, including sources that lost to a higher-precedence one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPlan {
    pub relays: Vec<String>,
    pub env_relays: Vec<String>,
    pub default_relays: Vec<String>,
    pub group_relays: Vec<String>,
    pub explicit_relays: Vec<String>,
    /// Group relays that are not already among the default relays.
    pub group_extras: Vec<String>,
}

impl RelayPlan {
    pub fn is_env_override(&self) -> bool {
        !self.env_relays.is_empty()
    }
}

/// Raw inputs to a relay plan. Every field is optional.
#[derive(Clone, Debug, Default)]
pub struct RelayPlanRequest {
    pub group_credential: Option<String>,
    pub decoded_group: Option<GroupPackage>,
    pub explicit_relays: Option<Vec<String>>,
    pub env_relay: Option<String>,
    pub base_relays: Option<Vec<String>>,
}

impl RelayPlanRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_credential(mut self, credential: &str) -> Self {
        self.group_credential = Some(credential.into());
        self
    }

    pub fn decoded_group(mut self, group: GroupPackage) -> Self {
        self.decoded_group = Some(group);
        self
    }

    pub fn explicit_relays(mut self, relays: Vec<String>) -> Self {
        self.explicit_relays = Some(relays);
        self
    }

    pub fn env_relay(mut self, relay: &str) -> Self {
        self.env_relay = Some(relay.into());
        self
    }

    pub fn base_relays(mut self, relays: Vec<String>) -> Self {
        self.base_relays = Some(relays);
        self
    }
}

pub struct RelayPlanner {
    settings: Arc<dyn RelaySettings>,
    decoder: Arc<dyn GroupDecoder>,
    fallback: Vec<String>,
}

impl Default for RelayPlanner {
    fn default() -> Self {
        Self::new(Arc::new(FileRelaySettings::from_default_path()))
    }
}

impl RelayPlanner {
    pub fn new(settings: Arc<dyn RelaySettings>) -> Self {
        Self {
            settings,
            decoder: Arc::new(Bech32GroupDecoder),
            fallback: FALLBACK_RELAYS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn GroupDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_fallback(mut self, fallback: Vec<String>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Compute the relay plan for `request`.
    ///
    /// Malformed inputs (undecodable credentials, bad URLs, blocked group
    /// relays) are dropped and logged.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NoRelaysConfigured`] only when every source and
    /// the fallback list are empty.
    pub fn compute(&self, request: &RelayPlanRequest) -> Result<RelayPlan> {
        let explicit_relays = normalize_source(
            "explicit",
            request.explicit_relays.as_deref().unwrap_or_default(),
        );

        let env_relay = request
            .env_relay
            .clone()
            .or_else(|| self.settings.env_relay());
        let env_relays = normalize_source("env", env_relay.as_slice());

        let default_relays = match &request.base_relays {
            Some(base) => normalize_source("base", base),
            None => match self.settings.override_relays() {
                Some(relays) => normalize_source("override", &relays),
                None => {
                    let builtin: Vec<String> =
                        DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect();
                    normalize_source("default", &builtin)
                }
            },
        };

        let group_relays = self.group_relays(request);

        let merged = if env_relays.is_empty() {
            dedupe_relays(
                explicit_relays
                    .iter()
                    .chain(&default_relays)
                    .chain(&group_relays)
                    .cloned(),
            )
        } else {
            debug!(relay = ?env_relays, "Environment relay override active");
            dedupe_relays(explicit_relays.iter().chain(&env_relays).cloned())
        };

        let relays = if merged.is_empty() {
            let fallback = normalize_source("fallback", &self.fallback);
            if fallback.is_empty() {
                return Err(RelayError::NoRelaysConfigured);
            }
            warn!("No relays configured, using built-in fallback relays");
            fallback
        } else {
            merged
        };

        let default_keys: HashSet<String> =
            default_relays.iter().map(|r| canonical_key(r)).collect();
        let group_extras = group_relays
            .iter()
            .filter(|r| !default_keys.contains(&canonical_key(r)))
            .cloned()
            .collect();

        debug!(
            relays = relays.len(),
            explicit = explicit_relays.len(),
            env = env_relays.len(),
            defaults = default_relays.len(),
            group = group_relays.len(),
            "Computed relay plan"
        );

        Ok(RelayPlan {
            relays,
            env_relays,
            default_relays,
            group_relays,
            explicit_relays,
            group_extras,
        })
    }

    fn group_relays(&self, request: &RelayPlanRequest) -> Vec<String> {
        let candidates = match (&request.decoded_group, &request.group_credential) {
            (Some(group), _) => group.relays.clone(),
            (None, Some(credential)) => match self.decoder.decode(credential) {
                Ok(group) => group.relays,
                Err(e) => {
                    debug!(error = %e, "Group credential did not decode, ignoring its relays");
                    Vec::new()
                }
            },
            (None, None) => Vec::new(),
        };

        normalize_source("group", &candidates)
            .into_iter()
            .filter(|relay| match check_group_relay(relay) {
                Ok(()) => true,
                Err(e) => {
                    warn!(relay = %relay, error = %e, "Dropping unsafe group relay");
                    false
                }
            })
            .collect()
    }
}

/// Compute a relay plan with the on-disk override file and `KEEP_RELAY`.
pub fn compute_relay_plan(request: &RelayPlanRequest) -> Result<RelayPlan> {
    RelayPlanner::default().compute(request)
}

fn normalize_source(source: &str, raw: &[String]) -> Vec<String> {
    let normalized = raw.iter().filter_map(|candidate| match normalize_relay_url(candidate) {
        Ok(url) => url,
        Err(e) => {
            debug!(source, error = %e, "Skipping relay candidate");
            None
        }
    });
    dedupe_relays(normalized)
}
