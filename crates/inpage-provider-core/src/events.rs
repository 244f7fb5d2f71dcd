//! Subscribable provider events.
//!
//! Emission never buffers: a listener attached after an event fired does not
//! see it. Listeners are invoked outside the registry lock, so they may
//! subscribe, unsubscribe or read provider state from inside a callback.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::domain::{ChainIdHex, WarningKey};
use crate::error::RpcError;
use crate::warnings::WarningLedger;

pub const DEFAULT_MAX_LISTENERS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Connect,
    Disconnect,
    ChainChanged,
    AccountsChanged,
    Message,
    /// Internal marker, not meant for dapps.
    Initialized,
    Close,
    Data,
    NetworkChanged,
    Notification,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::ChainChanged => "chainChanged",
            Self::AccountsChanged => "accountsChanged",
            Self::Message => "message",
            Self::Initialized => "_initialized",
            Self::Close => "close",
            Self::Data => "data",
            Self::NetworkChanged => "networkChanged",
            Self::Notification => "notification",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "chainChanged" => Self::ChainChanged,
            "accountsChanged" => Self::AccountsChanged,
            "message" => Self::Message,
            "_initialized" => Self::Initialized,
            "close" => Self::Close,
            "data" => Self::Data,
            "networkChanged" => Self::NetworkChanged,
            "notification" => Self::Notification,
            _ => return None,
        })
    }

    /// Warning fired on first subscription to a legacy event name.
    pub fn deprecation(&self) -> Option<WarningKey> {
        match self {
            Self::Close => Some(WarningKey::CloseEvent),
            Self::Data => Some(WarningKey::DataEvent),
            Self::NetworkChanged => Some(WarningKey::NetworkChangedEvent),
            Self::Notification => Some(WarningKey::NotificationEvent),
            _ => None,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Connect { chain_id: Option<ChainIdHex> },
    Disconnect(RpcError),
    ChainChanged(ChainIdHex),
    AccountsChanged(Vec<String>),
    Message { kind: String, data: Value },
    Initialized,
    Close(RpcError),
    Data(Value),
    NetworkChanged(String),
    Notification(Value),
}

impl ProviderEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::Connect { .. } => EventName::Connect,
            Self::Disconnect(_) => EventName::Disconnect,
            Self::ChainChanged(_) => EventName::ChainChanged,
            Self::AccountsChanged(_) => EventName::AccountsChanged,
            Self::Message { .. } => EventName::Message,
            Self::Initialized => EventName::Initialized,
            Self::Close(_) => EventName::Close,
            Self::Data(_) => EventName::Data,
            Self::NetworkChanged(_) => EventName::NetworkChanged,
            Self::Notification(_) => EventName::Notification,
        }
    }
}

pub type Listener = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    once: bool,
    callback: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_event: HashMap<EventName, Vec<ListenerEntry>>,
    leak_warned: HashSet<EventName>,
}

pub struct EventSurface {
    registry: Mutex<Registry>,
    warnings: WarningLedger,
    max_listeners: usize,
}

impl fmt::Debug for EventSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry();
        let counts: HashMap<&'static str, usize> = registry
            .by_event
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("EventSurface")
            .field("listeners", &counts)
            .field("max_listeners", &self.max_listeners)
            .finish()
    }
}

impl Default for EventSurface {
    fn default() -> Self {
        Self::new(WarningLedger::default(), DEFAULT_MAX_LISTENERS)
    }
}

impl EventSurface {
    /// `max_listeners == 0` disables the leak warning.
    pub fn new(warnings: WarningLedger, max_listeners: usize) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            warnings,
            max_listeners,
        }
    }

    pub fn warnings(&self) -> &WarningLedger {
        &self.warnings
    }

    pub fn on<F>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(listener), false, false)
    }

    pub fn add_listener<F>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        self.on(event, listener)
    }

    pub fn once<F>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(listener), true, false)
    }

    pub fn prepend_listener<F>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(listener), false, true)
    }

    pub fn prepend_once_listener<F>(&self, event: EventName, listener: F) -> ListenerId
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(listener), true, true)
    }

    pub fn remove_listener(&self, event: EventName, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let Some(entries) = registry.by_event.get_mut(&event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        before != entries.len()
    }

    /// Drops every listener of `event`, or of all events when `None`.
    pub fn remove_all_listeners(&self, event: Option<EventName>) {
        let mut registry = self.registry();
        match event {
            Some(event) => {
                registry.by_event.remove(&event);
            }
            None => registry.by_event.clear(),
        }
    }

    pub fn listener_count(&self, event: EventName) -> usize {
        self.registry()
            .by_event
            .get(&event)
            .map_or(0, |entries| entries.len())
    }

    /// Delivers `event` to its current listeners in registration order.
    /// Returns whether any listener was attached.
    pub fn emit(&self, event: &ProviderEvent) -> bool {
        let name = event.name();
        let callbacks: Vec<Listener> = {
            let mut registry = self.registry();
            let Some(entries) = registry.by_event.get_mut(&name) else {
                return false;
            };
            let callbacks = entries.iter().map(|e| Arc::clone(&e.callback)).collect();
            entries.retain(|entry| !entry.once);
            callbacks
        };
        if callbacks.is_empty() {
            return false;
        }
        for callback in callbacks {
            callback(event);
        }
        true
    }

    fn subscribe(
        &self,
        event: EventName,
        callback: Listener,
        once: bool,
        prepend: bool,
    ) -> ListenerId {
        if let Some(key) = event.deprecation() {
            self.warnings.warn_once(key);
        }

        let mut registry = self.registry();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        let entry = ListenerEntry { id, once, callback };
        let entries = registry.by_event.entry(event).or_default();
        if prepend {
            entries.insert(0, entry);
        } else {
            entries.push(entry);
        }
        let count = entries.len();

        if self.max_listeners > 0
            && count > self.max_listeners
            && registry.leak_warned.insert(event)
        {
            tracing::warn!(
                event = %event,
                count,
                max = self.max_listeners,
                "possible event listener leak detected"
            );
        }
        id
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
