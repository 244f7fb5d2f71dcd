//! Public EIP-1193 surface.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::domain::{
    ChainIdHex, InitialState, JsonRpcRequest, JsonRpcResponse, ProviderSnapshot, RpcPayload,
    RpcReply, WalletNotification, WarningKey, JSONRPC_VERSION,
};
use crate::error::{ProviderError, RpcError};
use crate::events::{EventName, EventSurface, DEFAULT_MAX_LISTENERS};
use crate::forwarder::RpcForwarder;
use crate::ports::{DetachedStream, RpcCallback, RpcEngine, StreamPort};
use crate::router::{NotificationRouter, RouteOutcome, RouterConfig};
use crate::store::ProviderStateStore;
use crate::validation::validate_request_args;
use crate::warnings::WarningLedger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOptions {
    pub max_event_listeners: usize,
    /// Method used for the one-time state hydration.
    pub provider_state_method: String,
    pub router: RouterConfig,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            max_event_listeners: DEFAULT_MAX_LISTENERS,
            provider_state_method: "metamask_getProviderState".to_owned(),
            router: RouterConfig::default(),
        }
    }
}

/// Call shapes accepted by the legacy `send`.
pub enum SendArgs {
    /// `send(method, params)`: answered asynchronously.
    Method { method: String, params: Option<Value> },
    /// `send(payload, callback)`: same as `send_async`.
    WithCallback {
        payload: RpcPayload,
        callback: RpcCallback,
    },
    /// `send(payload)`: answered from local state.
    Payload(JsonRpcRequest),
}

pub enum SendOutcome {
    Pending(PendingRequest),
    Dispatched,
    Sync(JsonRpcResponse),
}

/// A forwarded request whose callback has not fired yet.
#[derive(Debug)]
pub struct PendingRequest {
    rx: oneshot::Receiver<Result<Value, ProviderError>>,
}

impl PendingRequest {
    pub async fn wait(self) -> Result<Value, ProviderError> {
        self.rx.await.map_err(|_| {
            ProviderError::Transport("rpc engine dropped the request without answering".to_owned())
        })?
    }
}

pub struct InpageProvider<E> {
    store: Arc<ProviderStateStore>,
    forwarder: RpcForwarder<E>,
    router: NotificationRouter,
    options: ProviderOptions,
}

impl<E> fmt::Debug for InpageProvider<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InpageProvider")
            .field("state", &self.store.snapshot())
            .field("options", &self.options)
            .finish()
    }
}

impl<E: RpcEngine> InpageProvider<E> {
    pub fn new(engine: E, stream: Arc<dyn StreamPort>, options: ProviderOptions) -> Self {
        let events = EventSurface::new(WarningLedger::default(), options.max_event_listeners);
        let store = Arc::new(ProviderStateStore::new(events));
        let forwarder = RpcForwarder::new(engine, Arc::clone(&store));
        let router = NotificationRouter::new(options.router.clone(), Arc::clone(&store), stream);
        Self {
            store,
            forwarder,
            router,
            options,
        }
    }

    /// Provider without a destroyable stream, driven only through `engine`.
    pub fn with_engine(engine: E) -> Self {
        Self::new(engine, Arc::new(DetachedStream), ProviderOptions::default())
    }

    pub fn events(&self) -> &EventSurface {
        self.store.events()
    }

    pub fn store(&self) -> &Arc<ProviderStateStore> {
        &self.store
    }

    pub fn engine(&self) -> &E {
        self.forwarder.engine()
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Validates `args` and resolves with the RPC result.
    pub async fn request(&self, args: Value) -> Result<Value, ProviderError> {
        let args = validate_request_args(&args)?;
        self.dispatch(args.into()).wait().await
    }

    pub async fn request_method(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, ProviderError> {
        let mut args = json!({ "method": method });
        if let Some(params) = params {
            args["params"] = params;
        }
        self.request(args).await
    }

    /// Legacy callback form; the payload is forwarded without validation.
    pub fn send_async(&self, payload: RpcPayload, callback: RpcCallback) {
        self.forwarder.forward(payload, callback);
    }

    pub fn send(&self, args: SendArgs) -> Result<SendOutcome, ProviderError> {
        self.events().warnings().warn_once(WarningKey::SendMethod);
        match args {
            SendArgs::Method { method, params } => {
                if matches!(params, Some(ref p) if !p.is_array()) {
                    return Err(ProviderError::UnsupportedSync(method));
                }
                let mut args = json!({ "method": method });
                if let Some(params) = params {
                    args["params"] = params;
                }
                let args = validate_request_args(&args)?;
                Ok(SendOutcome::Pending(self.dispatch(args.into())))
            }
            SendArgs::WithCallback { payload, callback } => {
                self.send_async(payload, callback);
                Ok(SendOutcome::Dispatched)
            }
            SendArgs::Payload(request) => self.send_sync(request).map(SendOutcome::Sync),
        }
    }

    /// Legacy `enable()`: requests account access.
    pub async fn enable(&self) -> Result<Vec<String>, ProviderError> {
        self.events().warnings().warn_once(WarningKey::EnableMethod);
        let result = self.request_method("eth_requestAccounts", None).await?;
        serde_json::from_value(result).map_err(|e| {
            ProviderError::Rpc(RpcError::internal(format!(
                "eth_requestAccounts returned a non-account result: {e}"
            )))
        })
    }

    pub fn experimental(&self) -> ExperimentalApi<'_, E> {
        self.events().warnings().warn_once(WarningKey::ExperimentalApi);
        ExperimentalApi { provider: self }
    }

    /// One-time state hydration. A failed fetch still completes
    /// initialization, with unknown state.
    pub async fn initialize(&self) -> Result<(), ProviderError> {
        let request = JsonRpcRequest::new(self.options.provider_state_method.clone(), None);
        let fetched = self.dispatch(request).wait().await.and_then(|value| {
            serde_json::from_value::<InitialState>(value).map_err(|e| {
                ProviderError::Transport(format!("malformed provider state: {e}"))
            })
        });
        let initial = match fetched {
            Ok(initial) => Some(initial),
            Err(error) => {
                tracing::error!(%error, "failed to get initial provider state");
                None
            }
        };
        self.store.initialize_state(initial)
    }

    /// Resolves once the provider has been initialized.
    pub async fn wait_until_initialized(&self) {
        if self.store.is_initialized() {
            return;
        }
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));
        let id = self.events().once(EventName::Initialized, move |_| {
            if let Some(tx) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
                let _ = tx.send(());
            }
        });
        if self.store.is_initialized() {
            self.events().remove_listener(EventName::Initialized, id);
            return;
        }
        let _ = rx.await;
    }

    /// Entry point for out-of-band messages from the wallet.
    pub fn handle_notification(&self, notification: &WalletNotification) -> RouteOutcome {
        self.router.route(notification)
    }

    /// Called by the transport when the named stream ends.
    pub fn handle_stream_disconnect(&self, stream_name: &str, reason: Option<&str>) {
        tracing::warn!(stream = %stream_name, reason, "lost connection to wallet stream");
        self.store.handle_disconnect(false, reason);
    }

    pub fn chain_id(&self) -> Option<ChainIdHex> {
        self.store.chain_id()
    }

    pub fn network_version(&self) -> Option<String> {
        self.store.network_version()
    }

    pub fn accounts(&self) -> Option<Vec<String>> {
        self.store.accounts()
    }

    pub fn selected_address(&self) -> Option<String> {
        self.store.selected_address()
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_connected()
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    pub fn is_permanently_disconnected(&self) -> bool {
        self.store.is_permanently_disconnected()
    }

    pub fn snapshot(&self) -> ProviderSnapshot {
        self.store.snapshot()
    }

    fn dispatch(&self, request: JsonRpcRequest) -> PendingRequest {
        let (tx, rx) = oneshot::channel();
        self.forwarder.forward(
            RpcPayload::Single(request),
            Box::new(move |error, reply| {
                let _ = tx.send(settle(error, reply));
            }),
        );
        PendingRequest { rx }
    }

    fn send_sync(&self, request: JsonRpcRequest) -> Result<JsonRpcResponse, ProviderError> {
        let result = match request.method.as_str() {
            "eth_accounts" => json!(self.selected_address().into_iter().collect::<Vec<_>>()),
            "eth_coinbase" => json!(self.selected_address()),
            "eth_uninstallFilter" => {
                self.send_async(RpcPayload::Single(request.clone()), Box::new(|_, _| {}));
                Value::Bool(true)
            }
            "net_version" => json!(self.network_version()),
            _ => return Err(ProviderError::UnsupportedSync(request.method)),
        };
        Ok(JsonRpcResponse {
            jsonrpc: request
                .jsonrpc
                .unwrap_or_else(|| JSONRPC_VERSION.to_owned()),
            id: request.id,
            result: Some(result),
            error: None,
        })
    }
}

/// Experimental API surface; access logs a one-time warning.
pub struct ExperimentalApi<'a, E> {
    provider: &'a InpageProvider<E>,
}

impl<E: RpcEngine> ExperimentalApi<'_, E> {
    /// Validates every request, then forwards them as one batch.
    pub async fn request_batch(
        &self,
        requests: Vec<Value>,
    ) -> Result<Vec<JsonRpcResponse>, ProviderError> {
        let batch = requests
            .iter()
            .map(|args| validate_request_args(args).map(JsonRpcRequest::from))
            .collect::<Result<Vec<_>, _>>()?;

        let (tx, rx) = oneshot::channel();
        self.provider.send_async(
            RpcPayload::Batch(batch),
            Box::new(move |error, reply| {
                let outcome = match (error, reply) {
                    (Some(error), _) => Err(ProviderError::Rpc(error)),
                    (None, RpcReply::Batch(responses)) => Ok(responses),
                    (None, RpcReply::Single(response)) => Ok(vec![response]),
                };
                let _ = tx.send(outcome);
            }),
        );
        rx.await.map_err(|_| {
            ProviderError::Transport("rpc engine dropped the batch without answering".to_owned())
        })?
    }
}

fn settle(error: Option<RpcError>, reply: RpcReply) -> Result<Value, ProviderError> {
    if let Some(error) = error {
        return Err(ProviderError::Rpc(error));
    }
    match reply {
        RpcReply::Single(JsonRpcResponse {
            error: Some(error), ..
        }) => Err(ProviderError::Rpc(error)),
        RpcReply::Single(response) => Ok(response.result.unwrap_or(Value::Null)),
        RpcReply::Batch(_) => Err(ProviderError::Transport(
            "engine answered a single request with a batch".to_owned(),
        )),
    }
}
