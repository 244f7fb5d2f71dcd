use std::time::Duration;

use inpage_provider_core::{codes, RpcCallback, RpcEngine, RpcError, RpcPayload};

use crate::config::ProviderConfig;
use crate::deterministic::DeterministicWallet;
use crate::proxy::{failure_reply, HttpRpcEngine};

/// Runtime-selected RPC engine.
#[derive(Debug, Clone)]
pub enum WalletEngine {
    /// Every request is rejected with the recorded reason.
    Disabled(String),
    Deterministic(DeterministicWallet),
    Proxy(HttpRpcEngine),
}

impl Default for WalletEngine {
    fn default() -> Self {
        Self::with_config(&ProviderConfig::from_env())
    }
}

impl WalletEngine {
    pub fn with_config(config: &ProviderConfig) -> Self {
        let deterministic = || {
            Self::Deterministic(DeterministicWallet::new(
                config.deterministic_chain_id.clone(),
                config.deterministic_accounts.clone(),
            ))
        };

        let engine = if let Some(ref base_url) = config.proxy_url {
            let timeout = Duration::from_millis(config.proxy_timeout_ms);
            match HttpRpcEngine::new(base_url.clone(), timeout) {
                Ok(proxy) => Self::Proxy(proxy),
                Err(e) if config.strict_runtime_required() => Self::Disabled(format!(
                    "failed to initialize rpc proxy client in production profile: {e}"
                )),
                Err(e) => {
                    tracing::warn!(error = %e, "rpc proxy unavailable, using deterministic wallet");
                    deterministic()
                }
            }
        } else if config.strict_runtime_required() {
            Self::Disabled("rpc proxy URL not configured in production runtime profile".to_owned())
        } else {
            deterministic()
        };

        tracing::info!(mode = engine.mode_name(), "wallet engine selected");
        engine
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "disabled",
            Self::Deterministic(_) => "deterministic",
            Self::Proxy(_) => "proxy",
        }
    }

    pub fn deterministic(&self) -> Option<&DeterministicWallet> {
        match self {
            Self::Deterministic(wallet) => Some(wallet),
            _ => None,
        }
    }
}

impl RpcEngine for WalletEngine {
    fn handle(&self, payload: RpcPayload, callback: RpcCallback) {
        match self {
            Self::Disabled(reason) => {
                let error = RpcError::new(codes::UNAUTHORIZED, reason.clone());
                let reply = failure_reply(&payload, error.clone());
                callback(Some(error), reply);
            }
            Self::Deterministic(wallet) => wallet.handle(payload, callback),
            Self::Proxy(proxy) => proxy.handle(payload, callback),
        }
    }
}
