// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use keep_relay::{canonical_key, check_group_relay, normalize_relay_url, Result};
use serde_json::json;

use crate::output::Output;

#[derive(Debug, PartialEq, Eq)]
struct UrlCheck {
    input: String,
    normalized: Option<String>,
    key: Option<String>,
    rejection: Option<String>,
}

impl UrlCheck {
    fn allowed(&self) -> bool {
        self.normalized.is_some() && self.rejection.is_none()
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "input": self.input,
            "normalized": self.normalized,
            "canonical_key": self.key,
            "allowed": self.allowed(),
            "rejection": self.rejection,
        })
    }
}

fn check_url(raw: &str) -> UrlCheck {
    let mut check = UrlCheck {
        input: raw.to_string(),
        normalized: None,
        key: None,
        rejection: None,
    };
    match normalize_relay_url(raw) {
        Ok(Some(url)) => {
            check.key = Some(canonical_key(&url));
            check.rejection = check_group_relay(&url).err().map(|e| e.to_string());
            check.normalized = Some(url);
        }
        Ok(None) => check.rejection = Some("empty".into()),
        Err(e) => check.rejection = Some(e.to_string()),
    }
    check
}

pub fn cmd_check(out: &Output, urls: &[String], json: bool) -> Result<()> {
    let checks: Vec<UrlCheck> = urls.iter().map(|u| check_url(u)).collect();

    if json {
        let values: Vec<_> = checks.iter().map(UrlCheck::to_json).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    for check in &checks {
        out.header(&check.input);
        if let Some(normalized) = &check.normalized {
            out.field("Normalized", normalized);
        }
        if let Some(key) = &check.key {
            out.field("Canonical key", key);
        }
        match &check.rejection {
            None => out.success("Allowed as group relay"),
            Some(reason) => out.error(reason),
        }
    }
    Ok(())
}
