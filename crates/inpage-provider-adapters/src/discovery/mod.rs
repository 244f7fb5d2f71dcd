//! Wallet-discovery broadcast protocols.
//!
//! Payload checks are schema-only and fail fast with an error pointing at
//! the protocol document.

pub mod bus;
pub mod caip294;
pub mod eip6963;

pub use bus::{BusListenerId, DiscoveryBus, DiscoveryEvent};
pub use caip294::{announce_wallet, request_wallets, WalletAnnouncement, WalletData, WalletPrompt};
pub use eip6963::{announce_provider, request_provider, ProviderDetail, ProviderInfo};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::{Uuid, Variant, Version};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("invalid EIP-6963 {subject}: {reason}. See https://eips.ethereum.org/EIPS/eip-6963 for requirements")]
    Eip6963 {
        subject: &'static str,
        reason: String,
    },
    #[error("invalid CAIP-294 {subject}: {reason}. See https://github.com/ChainAgnostic/CAIPs/blob/main/CAIPs/caip-294.md for requirements")]
    Caip294 {
        subject: &'static str,
        reason: String,
    },
}

/// Identity shared by both protocols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub uuid: String,
    pub name: String,
    /// `data:image/...` URI.
    pub icon: String,
    /// Reverse-DNS identifier, e.g. `io.metamask`.
    pub rdns: String,
}

impl WalletInfo {
    /// Info with a freshly generated v4 uuid.
    pub fn generate(
        name: impl Into<String>,
        icon: impl Into<String>,
        rdns: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            name: name.into(),
            icon: icon.into(),
            rdns: rdns.into(),
        }
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        check_uuid_v4(&self.uuid)?;
        if self.name.is_empty() {
            return Err("name must be a non-empty string".to_owned());
        }
        if !self.icon.starts_with("data:image") {
            return Err("icon must be a data:image URI".to_owned());
        }
        if !is_fqdn(&self.rdns) {
            return Err(format!("rdns {:?} is not a reverse-DNS identifier", self.rdns));
        }
        Ok(())
    }
}

/// Lowercase hyphenated RFC 4122 version 4.
fn check_uuid_v4(raw: &str) -> Result<(), String> {
    let parsed =
        Uuid::try_parse(raw).map_err(|e| format!("uuid {raw:?} does not parse: {e}"))?;
    let canonical = parsed.hyphenated().to_string();
    if canonical != raw
        || parsed.get_version() != Some(Version::Random)
        || parsed.get_variant() != Variant::RFC4122
    {
        return Err(format!("uuid {raw:?} is not a lowercase v4 uuid"));
    }
    Ok(())
}

fn is_fqdn(raw: &str) -> bool {
    let name = raw.strip_suffix('.').unwrap_or(raw);
    if raw.len() < 4 || raw.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = name.split('.').collect();
    let Some((tld, rest)) = labels.split_last() else {
        return false;
    };
    if rest.is_empty() || !(2..=63).contains(&tld.len()) {
        return false;
    }
    if !tld.bytes().all(|b| b.is_ascii_alphabetic()) {
        return false;
    }
    rest.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}
