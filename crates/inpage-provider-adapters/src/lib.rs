pub mod channel;
pub mod config;
pub mod deterministic;
pub mod discovery;
pub mod engine;
pub mod proxy;
pub mod runtime;

pub use channel::{pump, spawn_pump, ChannelMessage, MessageChannel};
pub use config::{ConfigError, ProviderConfig, RuntimeProfile};
pub use deterministic::DeterministicWallet;
pub use discovery::{DiscoveryBus, DiscoveryError, DiscoveryEvent, WalletInfo};
pub use engine::WalletEngine;
pub use proxy::HttpRpcEngine;
pub use runtime::ProviderRuntime;
