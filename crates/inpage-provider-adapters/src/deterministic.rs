use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::Address;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedSender;

use inpage_provider_core::{
    codes, ChainIdHex, JsonRpcRequest, JsonRpcResponse, RpcCallback, RpcEngine, RpcError,
    RpcPayload, RpcReply, WalletNotification,
};

use crate::channel::ChannelMessage;

/// In-memory wallet answering the account and chain methods from fixed
/// state. Used in development profiles and tests.
#[derive(Debug, Clone)]
pub struct DeterministicWallet {
    state: Arc<Mutex<WalletState>>,
}

#[derive(Debug)]
struct WalletState {
    chain_id: ChainIdHex,
    accounts: Vec<Address>,
    permitted: bool,
    notifier: Option<UnboundedSender<ChannelMessage>>,
}

impl DeterministicWallet {
    pub fn new(chain_id: ChainIdHex, accounts: Vec<Address>) -> Self {
        Self {
            state: Arc::new(Mutex::new(WalletState {
                chain_id,
                accounts,
                permitted: false,
                notifier: None,
            })),
        }
    }

    /// Routes future state-change notifications into `sender`.
    pub fn attach(&self, sender: UnboundedSender<ChannelMessage>) {
        self.lock().notifier = Some(sender);
    }

    pub fn chain_id(&self) -> ChainIdHex {
        self.lock().chain_id.clone()
    }

    pub fn is_permitted(&self) -> bool {
        self.lock().permitted
    }

    pub fn debug_set_accounts(&self, accounts: Vec<Address>) {
        let mut g = self.lock();
        g.accounts = accounts;
        if g.permitted {
            let params = json!(exposed_accounts(&g));
            notify(&g, "metamask_accountsChanged", params);
        }
    }

    pub fn debug_switch_chain(&self, chain_id: ChainIdHex) {
        let mut g = self.lock();
        if g.chain_id == chain_id {
            return;
        }
        g.chain_id = chain_id;
        let params = chain_params(&g.chain_id);
        notify(&g, "metamask_chainChanged", params);
    }

    /// Drops the dapp's account permission.
    pub fn debug_revoke_accounts(&self) {
        let mut g = self.lock();
        if !std::mem::replace(&mut g.permitted, false) {
            return;
        }
        notify(&g, "metamask_accountsChanged", json!([]));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn answer(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match self.call(&request.method, request.params.as_ref()) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    fn call(&self, method: &str, params: Option<&Value>) -> Result<Value, RpcError> {
        let mut g = self.lock();
        match method {
            "eth_chainId" => Ok(json!(g.chain_id.as_str())),
            "net_version" => Ok(json!(g.chain_id.network_version())),
            "eth_accounts" => Ok(json!(exposed_accounts(&g))),
            "eth_requestAccounts" => {
                g.permitted = true;
                Ok(json!(exposed_accounts(&g)))
            }
            "metamask_getProviderState" => Ok(json!({
                "accounts": exposed_accounts(&g),
                "chainId": g.chain_id.as_str(),
                "isConnected": true,
                "networkVersion": g.chain_id.network_version(),
            })),
            "wallet_switchEthereumChain" => {
                let chain_id = params
                    .and_then(|p| p.get(0))
                    .and_then(|p| p.get("chainId"))
                    .and_then(Value::as_str)
                    .and_then(ChainIdHex::parse)
                    .ok_or_else(|| {
                        RpcError::new(
                            codes::INVALID_PARAMS,
                            "expected params [{ chainId }] with a hex chain id",
                        )
                    })?;
                if g.chain_id != chain_id {
                    g.chain_id = chain_id;
                    let params = chain_params(&g.chain_id);
                    notify(&g, "metamask_chainChanged", params);
                }
                Ok(Value::Null)
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }
}

impl RpcEngine for DeterministicWallet {
    fn handle(&self, payload: RpcPayload, callback: RpcCallback) {
        let reply = match payload {
            RpcPayload::Single(request) => RpcReply::Single(self.answer(request)),
            RpcPayload::Batch(requests) => {
                RpcReply::Batch(requests.into_iter().map(|r| self.answer(r)).collect())
            }
        };
        callback(None, reply);
    }
}

fn exposed_accounts(state: &WalletState) -> Vec<String> {
    if !state.permitted {
        return Vec::new();
    }
    state
        .accounts
        .iter()
        .map(|a| format!("0x{}", alloy::hex::encode(a.as_slice())))
        .collect()
}

fn chain_params(chain_id: &ChainIdHex) -> Value {
    json!({
        "chainId": chain_id.as_str(),
        "networkVersion": chain_id.network_version(),
    })
}

fn notify(state: &WalletState, method: &str, params: Value) {
    let Some(sender) = &state.notifier else {
        return;
    };
    let message = ChannelMessage::Notification(WalletNotification::new(method, params));
    if sender.send(message).is_err() {
        tracing::debug!(method, "notification dropped, provider stream closed");
    }
}
