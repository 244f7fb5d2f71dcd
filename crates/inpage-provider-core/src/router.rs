use std::sync::Arc;

use serde_json::{json, Value};

use crate::domain::WalletNotification;
use crate::error::{ProviderError, RpcError};
use crate::events::ProviderEvent;
use crate::ports::StreamPort;
use crate::store::ProviderStateStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub accounts_changed_method: String,
    pub chain_changed_method: String,
    pub stream_failure_method: String,
    /// Notifications re-emitted verbatim as `message` events.
    pub emitted_notifications: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            accounts_changed_method: "metamask_accountsChanged".to_owned(),
            chain_changed_method: "metamask_chainChanged".to_owned(),
            stream_failure_method: "METAMASK_STREAM_FAILURE".to_owned(),
            emitted_notifications: vec!["eth_subscription".to_owned()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    AccountsChanged,
    ChainChanged,
    Emitted,
    StreamFailure,
    Ignored,
}

pub struct NotificationRouter {
    config: RouterConfig,
    store: Arc<ProviderStateStore>,
    stream: Arc<dyn StreamPort>,
}

impl NotificationRouter {
    pub fn new(
        config: RouterConfig,
        store: Arc<ProviderStateStore>,
        stream: Arc<dyn StreamPort>,
    ) -> Self {
        Self {
            config,
            store,
            stream,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn route(&self, notification: &WalletNotification) -> RouteOutcome {
        let WalletNotification { method, params } = notification;

        if *method == self.config.accounts_changed_method {
            self.store.handle_accounts_changed(params, false);
            RouteOutcome::AccountsChanged
        } else if *method == self.config.chain_changed_method {
            // Either the bare id or `{ chainId, networkVersion }`.
            let chain_id = params.get("chainId").unwrap_or(params);
            self.store.handle_chain_changed(chain_id);
            RouteOutcome::ChainChanged
        } else if self.config.emitted_notifications.contains(method) {
            self.emit_message(method, params);
            RouteOutcome::Emitted
        } else if *method == self.config.stream_failure_method {
            tracing::error!("wallet reported unrecoverable stream failure");
            self.stream.destroy(ProviderError::Rpc(
                RpcError::permanently_disconnected(None),
            ));
            RouteOutcome::StreamFailure
        } else {
            tracing::debug!(%method, "ignoring unknown wallet notification");
            RouteOutcome::Ignored
        }
    }

    fn emit_message(&self, method: &str, params: &Value) {
        let events = self.store.events();
        events.emit(&ProviderEvent::Message {
            kind: method.to_owned(),
            data: params.clone(),
        });
        events.emit(&ProviderEvent::Data(json!({
            "method": method,
            "params": params,
        })));
        let legacy = params.get("result").unwrap_or(params);
        events.emit(&ProviderEvent::Notification(legacy.clone()));
    }
}
