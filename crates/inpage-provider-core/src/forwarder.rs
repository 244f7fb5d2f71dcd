use std::sync::Arc;

use crate::domain::{JsonRpcResponse, RpcPayload, RpcReply, WarningKey, JSONRPC_VERSION};
use crate::error::RpcError;
use crate::ports::{RpcCallback, RpcEngine};
use crate::store::ProviderStateStore;

/// Methods whose result is the active account list.
pub const ACCOUNT_METHODS: [&str; 2] = ["eth_accounts", "eth_requestAccounts"];

pub fn is_account_method(method: &str) -> bool {
    ACCOUNT_METHODS.contains(&method)
}

/// Wraps outbound requests in the JSON-RPC envelope and feeds account-method
/// results back into the state store before the caller sees them.
pub struct RpcForwarder<E> {
    engine: E,
    store: Arc<ProviderStateStore>,
}

impl<E: RpcEngine> RpcForwarder<E> {
    pub fn new(engine: E, store: Arc<ProviderStateStore>) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Hands `payload` to the engine. Errors and replies reach `callback`
    /// untouched; batches bypass all interception.
    pub fn forward(&self, payload: RpcPayload, callback: RpcCallback) {
        let mut request = match payload {
            RpcPayload::Single(request) => request,
            batch @ RpcPayload::Batch(_) => {
                self.engine.handle(batch, callback);
                return;
            }
        };

        if request.jsonrpc.is_none() {
            request.jsonrpc = Some(JSONRPC_VERSION.to_owned());
        }
        if let Some(key) = WarningKey::for_rpc_method(&request.method) {
            self.store.events().warnings().warn_once(key);
        }

        let callback: RpcCallback = if is_account_method(&request.method) {
            let store = Arc::clone(&self.store);
            let is_eth_accounts = request.method == "eth_accounts";
            Box::new(move |error: Option<RpcError>, reply: RpcReply| {
                if error.is_none() {
                    if let Some(JsonRpcResponse {
                        result: Some(result),
                        error: None,
                        ..
                    }) = reply.single()
                    {
                        store.handle_accounts_changed(result, is_eth_accounts);
                    }
                }
                callback(error, reply);
            })
        } else {
            callback
        };

        self.engine.handle(RpcPayload::Single(request), callback);
    }
}
