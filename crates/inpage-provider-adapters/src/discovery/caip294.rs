//! CAIP-294 browser wallet discovery. Messages travel as JSON-RPC shaped
//! event details.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use inpage_provider_core::JSONRPC_VERSION;

use super::bus::{BusListenerId, DiscoveryBus, DiscoveryEvent, CAIP294_ANNOUNCE, CAIP294_PROMPT};
use super::{DiscoveryError, WalletInfo};

pub const WALLET_ANNOUNCE_METHOD: &str = "wallet_announce";
pub const WALLET_PROMPT_METHOD: &str = "wallet_prompt";

/// Connection target, e.g. `{ "type": "caip-341", "value": "<extension id>" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTarget {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletData {
    #[serde(flatten)]
    pub info: WalletInfo,
    /// Browser extension id a dapp can connect to directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<WalletTarget>>,
}

impl WalletData {
    pub fn new(info: WalletInfo) -> Self {
        Self {
            info,
            extension_id: None,
            targets: None,
        }
    }

    pub fn validate(&self) -> Result<(), DiscoveryError> {
        self.check().map_err(|reason| DiscoveryError::Caip294 {
            subject: "WalletData",
            reason,
        })
    }

    fn check(&self) -> Result<(), String> {
        self.info.check()?;
        if matches!(self.extension_id.as_deref(), Some("")) {
            return Err("extensionId must be a non-empty string when present".to_owned());
        }
        if let Some(targets) = &self.targets {
            if targets.iter().any(|t| t.kind.is_empty()) {
                return Err("every target needs a non-empty type".to_owned());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletAnnouncement {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    pub params: WalletData,
}

impl WalletAnnouncement {
    pub fn new(params: WalletData) -> Self {
        Self {
            id: 1,
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: WALLET_ANNOUNCE_METHOD.to_owned(),
            params,
        }
    }

    pub fn validate(&self) -> Result<(), DiscoveryError> {
        check_envelope(&self.jsonrpc, &self.method, WALLET_ANNOUNCE_METHOD, CAIP294_ANNOUNCE)?;
        self.params.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletPrompt {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Default for WalletPrompt {
    fn default() -> Self {
        Self {
            id: 1,
            jsonrpc: JSONRPC_VERSION.to_owned(),
            method: WALLET_PROMPT_METHOD.to_owned(),
            params: json!({}),
        }
    }
}

impl WalletPrompt {
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        check_envelope(&self.jsonrpc, &self.method, WALLET_PROMPT_METHOD, CAIP294_PROMPT)?;
        if !self.params.is_object() {
            return Err(DiscoveryError::Caip294 {
                subject: CAIP294_PROMPT,
                reason: "params must be an object".to_owned(),
            });
        }
        Ok(())
    }
}

fn check_envelope(
    jsonrpc: &str,
    method: &str,
    expected: &str,
    subject: &'static str,
) -> Result<(), DiscoveryError> {
    let reason = if jsonrpc != JSONRPC_VERSION {
        format!("jsonrpc must be {JSONRPC_VERSION:?}, got {jsonrpc:?}")
    } else if method != expected {
        format!("method must be {expected:?}, got {method:?}")
    } else {
        return Ok(());
    };
    Err(DiscoveryError::Caip294 { subject, reason })
}

/// Announces `data` now and again on every valid `caip294:wallet_prompt`.
pub fn announce_wallet<P>(
    bus: &Arc<DiscoveryBus<P>>,
    data: WalletData,
) -> Result<BusListenerId, DiscoveryError>
where
    P: Send + Sync + 'static,
{
    data.validate()?;
    let event = DiscoveryEvent::WalletAnnounce(WalletAnnouncement::new(data));
    bus.dispatch(&event);

    let weak: Weak<DiscoveryBus<P>> = Arc::downgrade(bus);
    Ok(bus.add_listener(CAIP294_PROMPT, move |prompt| {
        let DiscoveryEvent::WalletPrompt(prompt) = prompt else {
            return;
        };
        if let Err(error) = prompt.validate() {
            tracing::error!(%error, "ignoring invalid wallet prompt");
            return;
        }
        if let Some(bus) = weak.upgrade() {
            bus.dispatch(&event);
        }
    }))
}

/// Calls `handler` with the data of every valid wallet announcement, then
/// prompts installed wallets to announce.
pub fn request_wallets<P, F>(bus: &Arc<DiscoveryBus<P>>, handler: F) -> BusListenerId
where
    P: Send + Sync + 'static,
    F: Fn(WalletData) + Send + Sync + 'static,
{
    let id = bus.add_listener(CAIP294_ANNOUNCE, move |event| {
        let DiscoveryEvent::WalletAnnounce(announcement) = event else {
            return;
        };
        match announcement.validate() {
            Ok(()) => handler(announcement.params.clone()),
            Err(error) => tracing::error!(%error, "ignoring invalid wallet announcement"),
        }
    });
    bus.dispatch(&DiscoveryEvent::WalletPrompt(WalletPrompt::default()));
    id
}
