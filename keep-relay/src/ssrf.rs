// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::error::{RelayError, Result};
use crate::relay_url::SECURE_SCHEME;

/// Check a relay taken from an untrusted source, such as a group credential.
///
/// Only literal inspection is performed: hostnames are not resolved.
///
/// # Errors
///
/// Returns [`RelayError::InvalidUrl`] if the URL does not parse and
/// [`RelayError::BlockedUrl`] if it is not `wss://` or names an internal host.
pub fn check_group_relay(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| RelayError::InvalidUrl(format!("{url}: {e}")))?;

    let blocked = |reason: &str| RelayError::BlockedUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if parsed.scheme() != SECURE_SCHEME {
        return Err(blocked("Must use wss:// protocol"));
    }

    match parsed.host() {
        None => Err(blocked("Missing host")),
        Some(Host::Domain(domain)) => {
            if is_internal_domain(domain) {
                Err(blocked("Internal hostname not allowed"))
            } else {
                Ok(())
            }
        }
        Some(Host::Ipv4(ip)) => {
            if is_internal_ip(&IpAddr::V4(ip)) {
                Err(blocked("Internal addresses not allowed"))
            } else {
                Ok(())
            }
        }
        Some(Host::Ipv6(ip)) => {
            if is_internal_ip(&IpAddr::V6(ip)) {
                Err(blocked("Internal addresses not allowed"))
            } else {
                Ok(())
            }
        }
    }
}

pub fn is_safe_group_relay(url: &str) -> bool {
    check_group_relay(url).is_ok()
}

fn is_internal_domain(domain: &str) -> bool {
    let host = domain.trim_end_matches('.').to_ascii_lowercase();
    host == "localhost" || host.ends_with(".localhost") || host.ends_with(".local")
}

/// Loopback, unspecified, link-local and private-range addresses.
pub fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => is_internal_ipv6(v6),
    }
}

fn is_internal_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_link_local()
        || ip.is_private()
        || ip.is_broadcast()
        // 0.0.0.0/8
        || octets[0] == 0
        // 100.64.0.0/10
        || (octets[0] == 100 && (64..=127).contains(&octets[1]))
}

fn is_internal_ipv6(ip: &Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_internal_ipv4(&mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fe80::/10
        || (first & 0xffc0) == 0xfe80
        // fc00::/7
        || (first & 0xfe00) == 0xfc00
}
