//! Keep Relay - relay list resolution for FROST signing nodes
//!
//! Merges relay candidates from several sources into the single ordered
//! list a node connects to:
//! - explicit relays chosen by the caller
//! - an operator override relay (`KEEP_RELAY`)
//! - configured defaults (`relays.toml`, or the built-in list)
//! - relays embedded in a group credential, which are untrusted and pass
//!   through an SSRF filter first

#![forbid(unsafe_code)]

pub mod error;
pub mod group;
pub mod plan;
pub mod relay_url;
pub mod settings;
pub mod ssrf;

pub use error::{RelayError, Result};
pub use group::{Bech32GroupDecoder, GroupDecoder, GroupPackage};
pub use plan::{
    compute_relay_plan, RelayPlan, RelayPlanRequest, RelayPlanner, DEFAULT_RELAYS,
    FALLBACK_RELAYS,
};
pub use relay_url::{canonical_key, dedupe_relays, normalize_relay_url};
pub use settings::{FileRelaySettings, RelaySettings, StaticRelaySettings, ENV_RELAY_VAR};
pub use ssrf::{check_group_relay, is_safe_group_relay};
