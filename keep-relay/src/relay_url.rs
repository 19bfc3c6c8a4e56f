// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Relay URL normalization and canonical keys.
//!
//! Normalization upgrades every accepted input to `wss://` and keeps the
//! rest of the caller's spelling. Equality between relays is decided by
//! [`canonical_key`], never by comparing normalized strings directly.

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{RelayError, Result};

/// Maximum length of a relay URL.
pub const MAX_RELAY_URL_LENGTH: usize = 256;

/// The only scheme relays are connected over.
pub const SECURE_SCHEME: &str = "wss";

const UPGRADABLE_SCHEMES: &[&str] = &["ws", "http", "https"];

static URL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?P<host>\[[^\]]*\]|[^/?#:]*)(?::(?P<port>[^/?#]*))?(?P<path>[^?#]*)(?P<query>\?[^#]*)?(?P<fragment>#.*)?$",
    )
    .expect("relay URL shape regex should compile")
});

/// Normalize a single relay candidate.
///
/// Returns `Ok(None)` for input that is empty after trimming, which callers
/// treat as absent rather than invalid.
///
/// # Errors
///
/// Returns [`RelayError::InvalidUrl`] for input containing whitespace,
/// input with an unsupported scheme, input without a host, or input longer
/// than [`MAX_RELAY_URL_LENGTH`].
pub fn normalize_relay_url(raw: &str) -> Result<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(RelayError::InvalidUrl(format!(
            "contains whitespace: {trimmed:?}"
        )));
    }

    let rest = match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            let scheme = scheme.to_ascii_lowercase();
            if scheme != SECURE_SCHEME && !UPGRADABLE_SCHEMES.contains(&scheme.as_str()) {
                return Err(RelayError::InvalidUrl(format!(
                    "unsupported scheme {scheme}: {trimmed}"
                )));
            }
            rest
        }
        None => trimmed,
    };

    if rest.is_empty() || rest.starts_with('/') {
        return Err(RelayError::InvalidUrl(format!("missing host: {trimmed}")));
    }

    let normalized = format!("{SECURE_SCHEME}://{rest}");
    if normalized.len() > MAX_RELAY_URL_LENGTH {
        return Err(RelayError::InvalidUrl("URL too long".into()));
    }
    Ok(Some(normalized))
}

/// Key used to decide whether two relay URLs name the same endpoint.
///
/// Shape: `scheme://host:port/path?query#fragment`, with scheme and host
/// lowercased, the scheme's default port filled in, and trailing slashes
/// removed from the path. Input the `url` crate rejects gets a best-effort
/// key of the same shape so near-identical malformed entries still collapse.
pub fn canonical_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed_key(&parsed),
        Err(_) => fallback_key(url),
    }
}

fn parsed_key(url: &Url) -> String {
    let scheme = url.scheme();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let port = url
        .port_or_known_default()
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    let path = url.path().trim_end_matches('/');
    let query = url.query().map(|q| format!("?{q}")).unwrap_or_default();
    let fragment = url.fragment().map(|f| format!("#{f}")).unwrap_or_default();
    format!("{scheme}://{host}{port}{path}{query}{fragment}")
}

fn fallback_key(url: &str) -> String {
    let trimmed = url.trim();
    let Some(caps) = URL_SHAPE.captures(trimmed) else {
        return trimmed.trim_end_matches('/').to_ascii_lowercase();
    };

    let scheme = caps["scheme"].to_ascii_lowercase();
    let host = caps["host"].to_ascii_lowercase();
    let port = match caps.name("port").map(|m| m.as_str()) {
        Some(p) if !p.is_empty() => format!(":{p}"),
        _ => default_port(&scheme)
            .map(|p| format!(":{p}"))
            .unwrap_or_default(),
    };
    let path = caps["path"].trim_end_matches('/');
    let query = caps.name("query").map_or("", |m| m.as_str());
    let fragment = caps.name("fragment").map_or("", |m| m.as_str());
    format!("{scheme}://{host}{port}{path}{query}{fragment}")
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "wss" | "https" => Some(443),
        "ws" | "http" => Some(80),
        _ => None,
    }
}

/// Remove entries whose canonical key was already seen, keeping the first.
pub fn dedupe_relays<I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(canonical_key(url)))
        .collect()
}
