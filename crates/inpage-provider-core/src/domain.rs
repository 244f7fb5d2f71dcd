use std::fmt;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

/// A `0x`-prefixed hexadecimal chain id, exactly as the wallet reported it.
///
/// Comparison is by string value, so `0x01` and `0x1` are distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainIdHex(String);

impl ChainIdHex {
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = raw.strip_prefix("0x")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_owned()))
    }

    pub fn from_number(chain_id: u64) -> Self {
        Self(format!("0x{chain_id:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decimal rendering used by the legacy `net_version` surface.
    pub fn network_version(&self) -> Option<String> {
        U256::from_str_radix(&self.0[2..], 16)
            .ok()
            .map(|v| v.to_string())
    }
}

impl TryFrom<String> for ChainIdHex {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid hex chain id: {value}"))
    }
}

impl From<ChainIdHex> for String {
    fn from(value: ChainIdHex) -> Self {
        value.0
    }
}

impl fmt::Display for ChainIdHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: None,
            id: None,
            method: method.into(),
            params,
        }
    }
}

impl From<RequestArguments> for JsonRpcRequest {
    fn from(args: RequestArguments) -> Self {
        Self::new(args.method, args.params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_owned()
}

impl JsonRpcResponse {
    pub fn success(id: Option<Id>, result: Value) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Id>, error: RpcError) -> Self {
        Self {
            jsonrpc: default_jsonrpc(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Outbound payload handed to the RPC engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcPayload {
    Single(JsonRpcRequest),
    Batch(Vec<JsonRpcRequest>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcReply {
    Single(JsonRpcResponse),
    Batch(Vec<JsonRpcResponse>),
}

impl RpcReply {
    pub fn single(&self) -> Option<&JsonRpcResponse> {
        match self {
            Self::Single(response) => Some(response),
            Self::Batch(_) => None,
        }
    }
}

/// Validated argument of `request`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestArguments {
    pub method: String,
    pub params: Option<Value>,
}

/// Out-of-band message pushed by the wallet, not tied to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletNotification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl WalletNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Hydration bundle returned by the wallet's provider-state method.
///
/// `accounts` and `chain_id` stay raw because they are untrusted network
/// data; the store applies its own coercion rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialState {
    #[serde(default)]
    pub accounts: Value,
    #[serde(default)]
    pub chain_id: Value,
    #[serde(default)]
    pub is_connected: Option<bool>,
}

/// Point-in-time copy of the provider state for readers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderSnapshot {
    pub accounts: Option<Vec<String>>,
    pub selected_address: Option<String>,
    pub chain_id: Option<ChainIdHex>,
    pub is_connected: bool,
    pub initialized: bool,
    pub is_permanently_disconnected: bool,
}

/// One-time warnings, fired at most once per provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKey {
    CloseEvent,
    DataEvent,
    NetworkChangedEvent,
    NotificationEvent,
    EnableMethod,
    SendMethod,
    ExperimentalApi,
    EthDecrypt,
    EthGetEncryptionPublicKey,
}

impl WarningKey {
    pub fn message(&self) -> &'static str {
        match self {
            Self::CloseEvent => {
                "the provider event 'close' is deprecated and may be removed; use 'disconnect' instead"
            }
            Self::DataEvent => {
                "the provider event 'data' is deprecated and will be removed; use 'message' instead"
            }
            Self::NetworkChangedEvent => {
                "the provider event 'networkChanged' is deprecated and may be removed; use 'chainChanged' instead"
            }
            Self::NotificationEvent => {
                "the provider event 'notification' is deprecated and may be removed; use 'message' instead"
            }
            Self::EnableMethod => {
                "'enable()' is deprecated and may be removed; use request({ method: 'eth_requestAccounts' }) instead"
            }
            Self::SendMethod => {
                "'send(...)' is deprecated and may be removed; use 'request' instead"
            }
            Self::ExperimentalApi => {
                "experimental provider methods may change or be removed without notice"
            }
            Self::EthDecrypt => "the RPC method 'eth_decrypt' is deprecated and may be removed",
            Self::EthGetEncryptionPublicKey => {
                "the RPC method 'eth_getEncryptionPublicKey' is deprecated and may be removed"
            }
        }
    }

    pub fn for_rpc_method(method: &str) -> Option<Self> {
        match method {
            "eth_decrypt" => Some(Self::EthDecrypt),
            "eth_getEncryptionPublicKey" => Some(Self::EthGetEncryptionPublicKey),
            _ => None,
        }
    }
}
