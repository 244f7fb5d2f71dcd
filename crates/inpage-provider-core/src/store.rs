//! Authoritative provider state and its transition functions.
//!
//! Every transition runs to completion under the state lock, compares
//! against the live stored values, and collects the events it produces.
//! Events are queued before the lock is released and delivered afterwards
//! by a single draining caller, so listeners observe transitions in the
//! order they were applied even when callers race across threads.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::domain::{ChainIdHex, InitialState, ProviderSnapshot};
use crate::error::{ProviderError, RpcError};
use crate::events::{EventSurface, ProviderEvent};

#[derive(Debug, Default)]
struct ProviderState {
    accounts: Option<Vec<String>>,
    selected_address: Option<String>,
    chain_id: Option<ChainIdHex>,
    is_connected: bool,
    initialized: bool,
    is_permanently_disconnected: bool,
}

/// Events waiting for delivery. `draining` is held by whichever caller is
/// currently emitting; everyone else only enqueues.
#[derive(Debug, Default)]
struct Delivery {
    queue: VecDeque<ProviderEvent>,
    draining: bool,
}

#[derive(Debug, Default)]
pub struct ProviderStateStore {
    state: Mutex<ProviderState>,
    delivery: Mutex<Delivery>,
    events: EventSurface,
}

/// Releases the drain if a listener panics mid-delivery.
struct DrainGuard<'a>(&'a ProviderStateStore);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.delivery().draining = false;
        }
    }
}

impl ProviderStateStore {
    pub fn new(events: EventSurface) -> Self {
        Self {
            state: Mutex::new(ProviderState::default()),
            delivery: Mutex::new(Delivery::default()),
            events,
        }
    }

    pub fn events(&self) -> &EventSurface {
        &self.events
    }

    /// Marks the provider connected. No-op while already connected or once
    /// permanently disconnected.
    pub fn handle_connect(&self, chain_id: Option<ChainIdHex>) {
        let mut out = Vec::new();
        let mut state = self.state();
        connect(&mut state, chain_id, &mut out);
        self.publish(state, out);
    }

    /// Recoverable disconnects only clear `is_connected` (code 1013). A
    /// non-recoverable one also wipes chain and accounts and latches
    /// `is_permanently_disconnected` for the rest of the instance's life
    /// (code 1011).
    pub fn handle_disconnect(&self, is_recoverable: bool, message: Option<&str>) {
        let mut state = self.state();
        if !(state.is_connected || (!state.is_permanently_disconnected && !is_recoverable)) {
            return;
        }
        state.is_connected = false;

        let error = if is_recoverable {
            RpcError::disconnected(message)
        } else {
            state.chain_id = None;
            state.accounts = None;
            state.selected_address = None;
            state.is_permanently_disconnected = true;
            RpcError::permanently_disconnected(message)
        };
        tracing::debug!(code = error.code, message = %error.message, "provider disconnected");
        let out = vec![ProviderEvent::Disconnect(error.clone()), ProviderEvent::Close(error)];
        self.publish(state, out);
    }

    /// Applies a chain id reported by the wallet. Malformed ids are logged
    /// and dropped.
    pub fn handle_chain_changed(&self, chain_id: &Value) {
        let mut out = Vec::new();
        let mut state = self.state();
        apply_chain(&mut state, chain_id, true, &mut out);
        self.publish(state, out);
    }

    /// Applies an account list reported by the wallet. Anything other than an
    /// array of strings is coerced to an empty list.
    ///
    /// `is_eth_accounts` marks updates coming from an `eth_accounts` response,
    /// which should never change already-known accounts.
    pub fn handle_accounts_changed(&self, accounts: &Value, is_eth_accounts: bool) {
        let mut out = Vec::new();
        let mut state = self.state();
        apply_accounts(&mut state, accounts, is_eth_accounts, &mut out);
        self.publish(state, out);
    }

    /// One-time hydration. `None` means the state fetch failed; the provider
    /// is still marked initialized.
    ///
    /// Transitions applied before this call update state silently. Once the
    /// bundle is applied and `initialized` flips, the resulting state is
    /// announced in order: `connect`, `chainChanged`, `accountsChanged`, then
    /// the internal `_initialized` marker.
    pub fn initialize_state(&self, initial: Option<InitialState>) -> Result<(), ProviderError> {
        let mut out = Vec::new();
        let mut state = self.state();
        if state.initialized {
            return Err(ProviderError::AlreadyInitialized);
        }

        match initial {
            Some(initial) => {
                let is_connected = initial.is_connected.unwrap_or(true);
                if is_connected {
                    let chain_id = initial.chain_id.as_str().and_then(ChainIdHex::parse);
                    connect(&mut state, chain_id, &mut out);
                }
                apply_chain(&mut state, &initial.chain_id, is_connected, &mut out);
                apply_accounts(&mut state, &initial.accounts, false, &mut out);
            }
            None => tracing::debug!("initializing provider without wallet state"),
        }

        state.initialized = true;

        if !state.is_permanently_disconnected {
            if state.is_connected {
                out.push(ProviderEvent::Connect {
                    chain_id: state.chain_id.clone(),
                });
            }
            if let Some(chain_id) = state.chain_id.clone() {
                push_chain_changed(chain_id, &mut out);
            }
            if let Some(accounts) = &state.accounts {
                out.push(ProviderEvent::AccountsChanged(accounts.clone()));
            }
        }
        out.push(ProviderEvent::Initialized);
        self.publish(state, out);
        Ok(())
    }

    pub fn snapshot(&self) -> ProviderSnapshot {
        let state = self.state();
        ProviderSnapshot {
            accounts: state.accounts.clone(),
            selected_address: state.selected_address.clone(),
            chain_id: state.chain_id.clone(),
            is_connected: state.is_connected,
            initialized: state.initialized,
            is_permanently_disconnected: state.is_permanently_disconnected,
        }
    }

    pub fn chain_id(&self) -> Option<ChainIdHex> {
        self.state().chain_id.clone()
    }

    pub fn network_version(&self) -> Option<String> {
        self.state()
            .chain_id
            .as_ref()
            .and_then(ChainIdHex::network_version)
    }

    pub fn accounts(&self) -> Option<Vec<String>> {
        self.state().accounts.clone()
    }

    pub fn selected_address(&self) -> Option<String> {
        self.state().selected_address.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    pub fn is_permanently_disconnected(&self) -> bool {
        self.state().is_permanently_disconnected
    }

    fn state(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delivery(&self) -> MutexGuard<'_, Delivery> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `out` while the transition's state lock is still held, then
    /// releases it and drains.
    fn publish(&self, state: MutexGuard<'_, ProviderState>, out: Vec<ProviderEvent>) {
        if !out.is_empty() {
            self.delivery().queue.extend(out);
        }
        drop(state);
        self.drain();
    }

    /// Emits queued events in FIFO order. A caller that finds a drain in
    /// progress (another thread, or a listener re-entering the store) leaves
    /// its events to that drain.
    fn drain(&self) {
        {
            let mut delivery = self.delivery();
            if delivery.draining || delivery.queue.is_empty() {
                return;
            }
            delivery.draining = true;
        }
        let _guard = DrainGuard(self);
        loop {
            let next = {
                let mut delivery = self.delivery();
                let next = delivery.queue.pop_front();
                if next.is_none() {
                    delivery.draining = false;
                }
                next
            };
            let Some(event) = next else {
                break;
            };
            self.events.emit(&event);
        }
    }
}

fn connect(state: &mut ProviderState, chain_id: Option<ChainIdHex>, out: &mut Vec<ProviderEvent>) {
    if state.is_connected || state.is_permanently_disconnected {
        return;
    }
    state.is_connected = true;
    if state.initialized {
        out.push(ProviderEvent::Connect { chain_id });
    }
}

fn apply_chain(
    state: &mut ProviderState,
    raw: &Value,
    implies_connect: bool,
    out: &mut Vec<ProviderEvent>,
) {
    if state.is_permanently_disconnected {
        tracing::debug!(chain_id = %raw, "ignoring chain change after permanent disconnect");
        return;
    }
    let Some(chain_id) = raw.as_str().and_then(ChainIdHex::parse) else {
        tracing::error!(chain_id = %raw, "received invalid chain id from wallet");
        return;
    };

    if implies_connect {
        connect(state, Some(chain_id.clone()), out);
    }
    if state.chain_id.as_ref() == Some(&chain_id) {
        return;
    }
    state.chain_id = Some(chain_id.clone());
    if state.initialized {
        push_chain_changed(chain_id, out);
    }
}

fn push_chain_changed(chain_id: ChainIdHex, out: &mut Vec<ProviderEvent>) {
    let network_version = chain_id.network_version();
    out.push(ProviderEvent::ChainChanged(chain_id));
    if let Some(network_version) = network_version {
        out.push(ProviderEvent::NetworkChanged(network_version));
    }
}

fn apply_accounts(
    state: &mut ProviderState,
    raw: &Value,
    is_eth_accounts: bool,
    out: &mut Vec<ProviderEvent>,
) {
    if state.is_permanently_disconnected {
        tracing::debug!("ignoring accounts change after permanent disconnect");
        return;
    }
    let accounts = coerce_accounts(raw);
    if state.accounts.as_deref() == Some(accounts.as_slice()) {
        return;
    }

    if is_eth_accounts && state.accounts.is_some() {
        tracing::warn!(
            ?accounts,
            "'eth_accounts' unexpectedly updated accounts; this indicates a wallet bug"
        );
    }

    state.selected_address = accounts.first().cloned();
    state.accounts = Some(accounts.clone());
    if state.initialized {
        out.push(ProviderEvent::AccountsChanged(accounts));
    }
}

fn coerce_accounts(raw: &Value) -> Vec<String> {
    let Value::Array(items) = raw else {
        tracing::error!(accounts = %raw, "received non-array accounts parameter from wallet");
        return Vec::new();
    };
    let accounts: Option<Vec<String>> = items
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect();
    accounts.unwrap_or_else(|| {
        tracing::error!(accounts = %raw, "received non-string account from wallet");
        Vec::new()
    })
}
