use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod codes {
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL: i64 = -32603;
    pub const UNAUTHORIZED: i64 = 4100;
    /// Close code "internal error": the connection will not recover.
    pub const DISCONNECTED_PERMANENT: i64 = 1011;
    /// Close code "try again later".
    pub const DISCONNECTED_RECOVERABLE: i64 = 1013;
}

pub const DISCONNECTED_MESSAGE: &str = "Disconnected from chain. Attempting to connect.";
pub const PERMANENTLY_DISCONNECTED_MESSAGE: &str =
    "Disconnected from wallet background. Page reload required.";

/// JSON-RPC error object, passed through opaquely from the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("rpc error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("the method {method} does not exist or is not available"),
        )
    }

    pub fn disconnected(message: Option<&str>) -> Self {
        Self::new(
            codes::DISCONNECTED_RECOVERABLE,
            message.unwrap_or(DISCONNECTED_MESSAGE),
        )
    }

    pub fn permanently_disconnected(message: Option<&str>) -> Self {
        Self::new(
            codes::DISCONNECTED_PERMANENT,
            message.unwrap_or(PERMANENTLY_DISCONNECTED_MESSAGE),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String, data: Value },
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("provider state already initialized")]
    AlreadyInitialized,
    #[error("the provider does not support synchronous method {0}")]
    UnsupportedSync(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn invalid_request(message: impl Into<String>, data: Value) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            data,
        }
    }

    /// JSON-RPC code a dapp would observe for this error.
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidRequest { .. } => codes::INVALID_REQUEST,
            Self::Rpc(err) => err.code,
            Self::UnsupportedSync(_) => codes::METHOD_NOT_FOUND,
            Self::AlreadyInitialized | Self::Transport(_) => codes::INTERNAL,
        }
    }
}
