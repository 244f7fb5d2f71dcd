use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::caip294::{WalletAnnouncement, WalletPrompt};
use super::eip6963::ProviderDetail;

pub const EIP6963_ANNOUNCE: &str = "eip6963:announceProvider";
pub const EIP6963_REQUEST: &str = "eip6963:requestProvider";
pub const CAIP294_ANNOUNCE: &str = "caip294:wallet_announce";
pub const CAIP294_PROMPT: &str = "caip294:wallet_prompt";

#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent<P> {
    AnnounceProvider(ProviderDetail<P>),
    RequestProvider,
    WalletAnnounce(WalletAnnouncement),
    WalletPrompt(WalletPrompt),
}

impl<P> DiscoveryEvent<P> {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AnnounceProvider(_) => EIP6963_ANNOUNCE,
            Self::RequestProvider => EIP6963_REQUEST,
            Self::WalletAnnounce(_) => CAIP294_ANNOUNCE,
            Self::WalletPrompt(_) => CAIP294_PROMPT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusListenerId(u64);

type BusListener<P> = Arc<dyn Fn(&DiscoveryEvent<P>) + Send + Sync>;

/// Page-scoped broadcast bus carrying discovery events between wallets and
/// dapps. Owned by whoever installs it; there is no global instance.
pub struct DiscoveryBus<P> {
    listeners: Mutex<Vec<(BusListenerId, &'static str, BusListener<P>)>>,
    next_id: AtomicU64,
}

impl<P> Default for DiscoveryBus<P> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<P> fmt::Debug for DiscoveryBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("DiscoveryBus")
            .field("listeners", &count)
            .finish()
    }
}

impl<P> DiscoveryBus<P> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_listener<F>(&self, event_type: &'static str, listener: F) -> BusListenerId
    where
        F: Fn(&DiscoveryEvent<P>) + Send + Sync + 'static,
    {
        let id = BusListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, event_type, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: BusListenerId) -> bool {
        let mut g = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = g.len();
        g.retain(|(existing, _, _)| *existing != id);
        g.len() != before
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, ty, _)| *ty == event_type)
            .count()
    }

    /// Delivers `event` to every listener of its type, in registration
    /// order. Listeners may dispatch further events.
    pub fn dispatch(&self, event: &DiscoveryEvent<P>) {
        let event_type = event.event_type();
        let targets: Vec<BusListener<P>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, ty, _)| *ty == event_type)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();
        tracing::debug!(event_type, listeners = targets.len(), "dispatching discovery event");
        for listener in targets {
            listener(event);
        }
    }
}
