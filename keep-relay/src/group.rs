// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use bech32::{Bech32m, Hrp};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

const GROUP_HRP: &str = "kgroup";
const GROUP_VERSION: u8 = 1;
const MAX_GROUP_RELAYS: usize = 32;

/// Public description of a FROST group as carried in a group credential.
///
/// The relay list is attacker-influenced: anyone who hands out a credential
/// chooses it. Consumers must filter it before connecting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPackage {
    pub version: u8,
    pub threshold: u16,
    pub total: u16,
    pub group_pubkey: String,
    #[serde(default, alias = "relay_urls")]
    pub relays: Vec<String>,
}

impl GroupPackage {
    pub fn new(threshold: u16, total: u16, group_pubkey: &[u8; 32]) -> Self {
        Self {
            version: GROUP_VERSION,
            threshold,
            total,
            group_pubkey: hex::encode(group_pubkey),
            relays: Vec::new(),
        }
    }

    pub fn with_relays(mut self, relays: Vec<String>) -> Self {
        self.relays = relays;
        self
    }

    pub fn group_pubkey_bytes(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(&self.group_pubkey)
            .map_err(|_| RelayError::GroupDecode("Invalid group pubkey hex".into()))?;
        bytes
            .try_into()
            .map_err(|_| RelayError::GroupDecode("Group pubkey must be 32 bytes".into()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let package: Self = serde_json::from_str(json)
            .map_err(|e| RelayError::GroupDecode(format!("JSON deserialization failed: {e}")))?;
        package.validate()?;
        Ok(package)
    }

    pub fn to_bech32(&self) -> Result<String> {
        let json = self.to_json()?;
        let hrp = Hrp::parse(GROUP_HRP)
            .map_err(|e| RelayError::GroupDecode(format!("Invalid HRP: {e}")))?;
        bech32::encode::<Bech32m>(hrp, json.as_bytes())
            .map_err(|e| RelayError::GroupDecode(format!("Bech32 encoding failed: {e}")))
    }

    pub fn from_bech32(encoded: &str) -> Result<Self> {
        let (hrp, data) = bech32::decode(encoded.trim())
            .map_err(|e| RelayError::GroupDecode(format!("Bech32 decoding failed: {e}")))?;

        if hrp.as_str() != GROUP_HRP {
            return Err(RelayError::GroupDecode(format!(
                "Invalid prefix: expected {GROUP_HRP}, got {}",
                hrp.as_str()
            )));
        }

        let json = String::from_utf8(data)
            .map_err(|_| RelayError::GroupDecode("Invalid UTF-8 in group credential".into()))?;

        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.version != GROUP_VERSION {
            return Err(RelayError::GroupDecode(format!(
                "Unsupported version: {}",
                self.version
            )));
        }
        if self.threshold == 0 || self.threshold > self.total {
            return Err(RelayError::GroupDecode(format!(
                "Invalid threshold {} of {}",
                self.threshold, self.total
            )));
        }
        if self.relays.len() > MAX_GROUP_RELAYS {
            return Err(RelayError::GroupDecode(format!(
                "Too many relays: {} (max {MAX_GROUP_RELAYS})",
                self.relays.len()
            )));
        }
        self.group_pubkey_bytes().map(|_| ())
    }
}

/// Turns an encoded group credential into a [`GroupPackage`].
pub trait GroupDecoder: Send + Sync {
    fn decode(&self, credential: &str) -> Result<GroupPackage>;
}

/// Decoder for `kgroup1...` bech32m credentials.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bech32GroupDecoder;

impl GroupDecoder for Bech32GroupDecoder {
    fn decode(&self, credential: &str) -> Result<GroupPackage> {
        GroupPackage::from_bech32(credential)
    }
}
