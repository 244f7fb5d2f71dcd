pub mod domain;
pub mod error;
pub mod events;
pub mod forwarder;
pub mod ports;
pub mod provider;
pub mod router;
pub mod store;
pub mod validation;
pub mod warnings;

pub use domain::{
    ChainIdHex, Id, InitialState, JsonRpcRequest, JsonRpcResponse, ProviderSnapshot,
    RequestArguments, RpcPayload, RpcReply, WalletNotification, WarningKey, JSONRPC_VERSION,
};
pub use error::{codes, ProviderError, RpcError};
pub use events::{EventName, EventSurface, ListenerId, ProviderEvent};
pub use forwarder::{is_account_method, RpcForwarder, ACCOUNT_METHODS};
pub use ports::{DetachedStream, RpcCallback, RpcEngine, StreamPort};
pub use provider::{
    ExperimentalApi, InpageProvider, PendingRequest, ProviderOptions, SendArgs, SendOutcome,
};
pub use router::{NotificationRouter, RouteOutcome, RouterConfig};
pub use store::ProviderStateStore;
pub use validation::validate_request_args;
pub use warnings::WarningLedger;
