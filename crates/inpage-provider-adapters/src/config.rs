use alloy::primitives::{address, Address};
use thiserror::Error;

use inpage_provider_core::{ChainIdHex, ProviderOptions, RouterConfig};

pub const ENV_PROFILE: &str = "INPAGE_PROVIDER_PROFILE";
pub const ENV_PROXY_URL: &str = "INPAGE_PROVIDER_PROXY_URL";
pub const ENV_PROXY_TIMEOUT_MS: &str = "INPAGE_PROVIDER_PROXY_TIMEOUT_MS";
pub const ENV_MAX_EVENT_LISTENERS: &str = "INPAGE_PROVIDER_MAX_EVENT_LISTENERS";
pub const ENV_STREAM_NAME: &str = "INPAGE_PROVIDER_STREAM_NAME";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

impl RuntimeProfile {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_PROFILE,
                value: raw.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub runtime_profile: RuntimeProfile,
    /// JSON-RPC endpoint the proxy engine posts to.
    pub proxy_url: Option<String>,
    pub proxy_timeout_ms: u64,
    pub max_event_listeners: usize,
    pub json_rpc_stream_name: String,
    pub provider_state_method: String,
    pub deterministic_chain_id: ChainIdHex,
    pub deterministic_accounts: Vec<Address>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let options = ProviderOptions::default();
        Self {
            runtime_profile: RuntimeProfile::Development,
            proxy_url: None,
            proxy_timeout_ms: 15_000,
            max_event_listeners: options.max_event_listeners,
            json_rpc_stream_name: "metamask-provider".to_owned(),
            provider_state_method: options.provider_state_method,
            deterministic_chain_id: ChainIdHex::from_number(1),
            deterministic_accounts: vec![address!("1000000000000000000000000000000000000001")],
        }
    }
}

impl ProviderConfig {
    /// Reads overrides from the process environment. Each invalid value is
    /// logged and only that field keeps its default. An unrecognized profile
    /// resolves to `Production`, so a typo never enables the deterministic
    /// wallet.
    pub fn from_env() -> Self {
        Self::from_lookup_lenient(|key| std::env::var(key).ok())
    }

    /// Strict variant: the first invalid value is returned as an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut first = None;
        let config = Self::collect(lookup, |error| {
            first.get_or_insert(error);
        });
        match first {
            Some(error) => Err(error),
            None => Ok(config),
        }
    }

    pub fn from_lookup_lenient<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::collect(lookup, |error| {
            tracing::warn!(%error, "ignoring invalid provider environment value");
        })
    }

    fn collect<F, R>(lookup: F, mut reject: R) -> Self
    where
        F: Fn(&str) -> Option<String>,
        R: FnMut(ConfigError),
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_PROFILE) {
            config.runtime_profile = RuntimeProfile::parse(&raw).unwrap_or_else(|error| {
                reject(error);
                RuntimeProfile::Production
            });
        }
        if let Some(raw) = lookup(ENV_PROXY_URL) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.proxy_url = Some(trimmed.to_owned());
            }
        }
        if let Some(raw) = lookup(ENV_PROXY_TIMEOUT_MS) {
            match parse_number(ENV_PROXY_TIMEOUT_MS, &raw) {
                Ok(value) => config.proxy_timeout_ms = value,
                Err(error) => reject(error),
            }
        }
        if let Some(raw) = lookup(ENV_MAX_EVENT_LISTENERS) {
            match parse_number(ENV_MAX_EVENT_LISTENERS, &raw) {
                Ok(value) => config.max_event_listeners = value,
                Err(error) => reject(error),
            }
        }
        if let Some(raw) = lookup(ENV_STREAM_NAME) {
            config.json_rpc_stream_name = raw;
        }
        config
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            max_event_listeners: self.max_event_listeners,
            provider_state_method: self.provider_state_method.clone(),
            router: RouterConfig::default(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_owned(),
    })
}
