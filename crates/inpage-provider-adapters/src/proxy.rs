use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

use inpage_provider_core::{
    Id, JsonRpcRequest, JsonRpcResponse, ProviderError, RpcCallback, RpcEngine, RpcError,
    RpcPayload, RpcReply, JSONRPC_VERSION,
};

type Job = (RpcPayload, RpcCallback);

/// Engine that posts every payload to a JSON-RPC HTTP endpoint.
///
/// The blocking client lives on a dedicated worker thread, so the engine
/// can be created, used and dropped from async code. Calls are posted in
/// submission order.
#[derive(Debug, Clone)]
pub struct HttpRpcEngine {
    base_url: String,
    jobs: mpsc::Sender<Job>,
}

impl HttpRpcEngine {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let base_url = base_url.into();
        let (jobs, rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let url = base_url.clone();
        thread::Builder::new()
            .name("rpc-proxy".to_owned())
            .spawn(move || {
                let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
                    Ok(client) => {
                        let _ = ready_tx.send(Ok(()));
                        client
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                for (payload, callback) in rx {
                    let payload = envelope(payload);
                    match post(&client, &url, &payload) {
                        Ok(reply) => callback(None, reply),
                        Err(error) => {
                            tracing::warn!(url = %url, %error, "rpc proxy call failed");
                            let stub = failure_reply(&payload, error.clone());
                            callback(Some(error), stub);
                        }
                    }
                }
                tracing::debug!(url = %url, "rpc proxy worker stopped");
            })
            .map_err(|e| ProviderError::Transport(format!("failed to spawn rpc proxy worker: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { base_url, jobs }),
            Ok(Err(reason)) => Err(ProviderError::Transport(format!(
                "failed to build rpc proxy client: {reason}"
            ))),
            Err(_) => Err(ProviderError::Transport(
                "rpc proxy worker exited during startup".to_owned(),
            )),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RpcEngine for HttpRpcEngine {
    fn handle(&self, payload: RpcPayload, callback: RpcCallback) {
        if let Err(mpsc::SendError((payload, callback))) = self.jobs.send((payload, callback)) {
            let error = RpcError::internal("rpc proxy worker is gone");
            let stub = failure_reply(&payload, error.clone());
            callback(Some(error), stub);
        }
    }
}

fn post(
    client: &reqwest::blocking::Client,
    url: &str,
    payload: &RpcPayload,
) -> Result<RpcReply, RpcError> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .map_err(|e| RpcError::internal(format!("rpc proxy request failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        let mut error = RpcError::internal(format!("rpc proxy status {status}"));
        // Gateways often answer with HTML; keep whatever body there is.
        let text = response.text().unwrap_or_default();
        if !text.trim().is_empty() {
            let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
            error = error.with_data(data);
        }
        return Err(error);
    }
    response
        .json::<RpcReply>()
        .map_err(|e| RpcError::internal(format!("rpc proxy returned a non json-rpc body: {e}")))
}

/// Fills in the envelope fields a strict JSON-RPC server requires.
fn envelope(payload: RpcPayload) -> RpcPayload {
    fn tag(mut request: JsonRpcRequest, index: u64) -> JsonRpcRequest {
        request
            .jsonrpc
            .get_or_insert_with(|| JSONRPC_VERSION.to_owned());
        request.id.get_or_insert(Id::Number(index + 1));
        request
    }
    match payload {
        RpcPayload::Single(request) => RpcPayload::Single(tag(request, 0)),
        RpcPayload::Batch(requests) => RpcPayload::Batch(
            requests
                .into_iter()
                .zip(0u64..)
                .map(|(request, index)| tag(request, index))
                .collect(),
        ),
    }
}

pub(crate) fn failure_reply(payload: &RpcPayload, error: RpcError) -> RpcReply {
    match payload {
        RpcPayload::Single(request) => {
            RpcReply::Single(JsonRpcResponse::failure(request.id.clone(), error))
        }
        RpcPayload::Batch(requests) => RpcReply::Batch(
            requests
                .iter()
                .map(|r| JsonRpcResponse::failure(r.id.clone(), error.clone()))
                .collect(),
        ),
    }
}
