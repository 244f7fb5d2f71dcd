//! EIP-6963 multi-injected-provider discovery.

use std::sync::{Arc, Weak};

use super::bus::{BusListenerId, DiscoveryBus, DiscoveryEvent, EIP6963_ANNOUNCE, EIP6963_REQUEST};
use super::{DiscoveryError, WalletInfo};

pub type ProviderInfo = WalletInfo;

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDetail<P> {
    pub info: ProviderInfo,
    pub provider: P,
}

impl<P> ProviderDetail<P> {
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        self.info.check().map_err(|reason| DiscoveryError::Eip6963 {
            subject: "ProviderDetail",
            reason,
        })
    }
}

/// Announces `detail` now and again on every `eip6963:requestProvider`.
///
/// Returns the id of the re-announce listener; removing it stops further
/// announcements.
pub fn announce_provider<P>(
    bus: &Arc<DiscoveryBus<P>>,
    detail: ProviderDetail<P>,
) -> Result<BusListenerId, DiscoveryError>
where
    P: Clone + Send + Sync + 'static,
{
    detail.validate()?;
    let event = DiscoveryEvent::AnnounceProvider(detail);
    bus.dispatch(&event);

    let weak: Weak<DiscoveryBus<P>> = Arc::downgrade(bus);
    Ok(bus.add_listener(EIP6963_REQUEST, move |_| {
        if let Some(bus) = weak.upgrade() {
            bus.dispatch(&event);
        }
    }))
}

/// Calls `handler` for every valid provider announcement, then asks
/// already-installed wallets to announce themselves.
pub fn request_provider<P, F>(bus: &Arc<DiscoveryBus<P>>, handler: F) -> BusListenerId
where
    P: Clone + Send + Sync + 'static,
    F: Fn(ProviderDetail<P>) + Send + Sync + 'static,
{
    let id = bus.add_listener(EIP6963_ANNOUNCE, move |event| {
        let DiscoveryEvent::AnnounceProvider(detail) = event else {
            return;
        };
        match detail.validate() {
            Ok(()) => handler(detail.clone()),
            Err(error) => tracing::error!(%error, "ignoring invalid provider announcement"),
        }
    });
    bus.dispatch(&DiscoveryEvent::RequestProvider);
    id
}
