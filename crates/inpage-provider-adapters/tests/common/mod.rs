#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Method, Response, Server, StatusCode};

use inpage_provider_adapters::{ProviderConfig, RuntimeProfile, WalletInfo};

pub const ICON: &str = "data:image/svg+xml;base64,PHN2Zz48L3N2Zz4=";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn dev_config() -> ProviderConfig {
    ProviderConfig {
        runtime_profile: RuntimeProfile::Development,
        proxy_url: None,
        ..ProviderConfig::default()
    }
}

pub fn wallet_info(name: &str, rdns: &str) -> WalletInfo {
    WalletInfo::generate(name, ICON, rdns)
}

/// Canned answers keyed by method; unknown methods get -32601.
pub type MethodTable = HashMap<&'static str, Value>;

/// JSON-RPC server answering single and batch POSTs from `table`. Every
/// request body is recorded. Requests to `/fail` get a 500 with a JSON body,
/// `/gateway` a 502 HTML page.
pub fn spawn_rpc_server(
    table: MethodTable,
    bodies: Arc<Mutex<Vec<Value>>>,
) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());

    let join = thread::spawn(move || {
        for _ in 0..16 {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut raw = String::new();
            let _ = req.as_reader().read_to_string(&mut raw);
            let body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
            if let Ok(mut g) = bodies.lock() {
                g.push(body.clone());
            }

            if req.url() == "/gateway" {
                let page = Response::from_string("<html><body>502 Bad Gateway</body></html>")
                    .with_status_code(StatusCode(502));
                let _ = req.respond(page);
                continue;
            }

            let (code, payload) = match (req.method().clone(), req.url()) {
                (Method::Post, "/fail") => (500, json!({ "error": "backend down" })),
                (Method::Post, _) => match &body {
                    Value::Array(items) => {
                        (200, Value::Array(items.iter().map(|i| answer(&table, i)).collect()))
                    }
                    single => (200, answer(&table, single)),
                },
                _ => (404, json!({ "error": "not found" })),
            };

            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
    });

    (addr, join)
}

fn answer(table: &MethodTable, request: &Value) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
    match table.get(method) {
        Some(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        None => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("{method} not found") }
        }),
    }
}
