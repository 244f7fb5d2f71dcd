#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use inpage_provider_core::{
    ChainIdHex, EventName, EventSurface, InitialState, JsonRpcRequest, JsonRpcResponse,
    ProviderError, ProviderEvent, ProviderStateStore, RpcCallback, RpcEngine, RpcError,
    RpcPayload, RpcReply, StreamPort,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine answering from a fixed method table, synchronously.
#[derive(Default)]
pub struct ScriptedEngine {
    results: Mutex<HashMap<String, Value>>,
    errors: Mutex<HashMap<String, RpcError>>,
    engine_failure: Mutex<Option<RpcError>>,
    seen: Mutex<Vec<RpcPayload>>,
}

impl ScriptedEngine {
    pub fn with_result(self, method: &str, result: Value) -> Self {
        self.results
            .lock()
            .expect("results lock")
            .insert(method.to_owned(), result);
        self
    }

    pub fn with_error(self, method: &str, error: RpcError) -> Self {
        self.errors
            .lock()
            .expect("errors lock")
            .insert(method.to_owned(), error);
        self
    }

    /// Every call fails at the engine level, before producing a response.
    pub fn failing(self, error: RpcError) -> Self {
        *self.engine_failure.lock().expect("failure lock") = Some(error);
        self
    }

    pub fn set_result(&self, method: &str, result: Value) {
        self.results
            .lock()
            .expect("results lock")
            .insert(method.to_owned(), result);
    }

    pub fn seen(&self) -> Vec<RpcPayload> {
        self.seen.lock().expect("seen lock").clone()
    }

    fn answer(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        if let Some(error) = self.errors.lock().expect("errors lock").get(&request.method) {
            return JsonRpcResponse::failure(request.id.clone(), error.clone());
        }
        match self.results.lock().expect("results lock").get(&request.method) {
            Some(result) => JsonRpcResponse::success(request.id.clone(), result.clone()),
            None => JsonRpcResponse::failure(
                request.id.clone(),
                RpcError::method_not_found(&request.method),
            ),
        }
    }
}

impl RpcEngine for ScriptedEngine {
    fn handle(&self, payload: RpcPayload, callback: RpcCallback) {
        self.seen.lock().expect("seen lock").push(payload.clone());
        if let Some(error) = self.engine_failure.lock().expect("failure lock").clone() {
            let reply = RpcReply::Single(JsonRpcResponse::failure(None, error.clone()));
            callback(Some(error), reply);
            return;
        }
        let reply = match &payload {
            RpcPayload::Single(request) => RpcReply::Single(self.answer(request)),
            RpcPayload::Batch(requests) => {
                RpcReply::Batch(requests.iter().map(|r| self.answer(r)).collect())
            }
        };
        callback(None, reply);
    }
}

/// Engine that never answers on its own; callbacks are released by the test.
#[derive(Default)]
pub struct HeldEngine {
    pending: Mutex<Vec<(RpcPayload, RpcCallback)>>,
}

impl HeldEngine {
    pub fn pending_count(&self) -> usize {
        self.pending.lock().expect("pending lock").len()
    }

    pub fn release_next(&self, error: Option<RpcError>, reply: RpcReply) -> RpcPayload {
        let (payload, callback) = self.pending.lock().expect("pending lock").remove(0);
        callback(error, reply);
        payload
    }

    pub fn drop_all(&self) {
        self.pending.lock().expect("pending lock").clear();
    }
}

impl RpcEngine for HeldEngine {
    fn handle(&self, payload: RpcPayload, callback: RpcCallback) {
        self.pending
            .lock()
            .expect("pending lock")
            .push((payload, callback));
    }
}

#[derive(Default)]
pub struct RecordingStream {
    destroyed: Mutex<Vec<ProviderError>>,
}

impl RecordingStream {
    pub fn destroyed(&self) -> Vec<ProviderError> {
        self.destroyed.lock().expect("destroyed lock").clone()
    }
}

impl StreamPort for RecordingStream {
    fn destroy(&self, error: ProviderError) {
        self.destroyed.lock().expect("destroyed lock").push(error);
    }
}

/// Captures emitted events, in order, across the listened names.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ProviderEvent>>>,
}

impl EventLog {
    pub fn attach(surface: &EventSurface, names: &[EventName]) -> Self {
        let log = Self::default();
        for name in names {
            let events = Arc::clone(&log.events);
            surface.on(*name, move |event| {
                events.lock().expect("event log lock").push(event.clone());
            });
        }
        log
    }

    /// Listens to the EIP-1193 events plus the internal marker.
    pub fn attach_standard(surface: &EventSurface) -> Self {
        Self::attach(
            surface,
            &[
                EventName::Connect,
                EventName::Disconnect,
                EventName::ChainChanged,
                EventName::AccountsChanged,
                EventName::Message,
                EventName::Initialized,
            ],
        )
    }

    pub fn all(&self) -> Vec<ProviderEvent> {
        self.events.lock().expect("event log lock").clone()
    }

    pub fn named(&self, name: EventName) -> Vec<ProviderEvent> {
        self.all().into_iter().filter(|e| e.name() == name).collect()
    }

    pub fn names(&self) -> Vec<EventName> {
        self.all().iter().map(ProviderEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event log lock").clear();
    }
}

pub fn chain(raw: &str) -> ChainIdHex {
    ChainIdHex::parse(raw).expect("valid chain id")
}

pub fn initial_state(accounts: Value, chain_id: &str) -> InitialState {
    InitialState {
        accounts,
        chain_id: json!(chain_id),
        is_connected: None,
    }
}

/// Store initialized with the given accounts and chain, log cleared.
pub fn initialized_store(accounts: Value, chain_id: &str) -> (ProviderStateStore, EventLog) {
    let store = ProviderStateStore::default();
    let log = EventLog::attach_standard(store.events());
    store
        .initialize_state(Some(initial_state(accounts, chain_id)))
        .expect("first initialization");
    log.clear();
    (store, log)
}
