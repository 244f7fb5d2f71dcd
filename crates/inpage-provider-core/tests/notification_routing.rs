mod common;

use std::sync::Arc;

use serde_json::json;

use inpage_provider_core::{
    codes, EventName, InpageProvider, ProviderError, ProviderEvent, ProviderOptions,
    RouteOutcome, RouterConfig, WalletNotification,
};

use common::{chain, init_tracing, EventLog, RecordingStream, ScriptedEngine};

fn provider_with_stream() -> (InpageProvider<ScriptedEngine>, Arc<RecordingStream>) {
    let stream = Arc::new(RecordingStream::default());
    let provider = InpageProvider::new(
        ScriptedEngine::default()
            .with_result("metamask_getProviderState", json!({ "accounts": ["0xA"], "chainId": "0x1" })),
        stream.clone(),
        ProviderOptions::default(),
    );
    (provider, stream)
}

#[tokio::test]
async fn accounts_notification_updates_state() {
    let (provider, _stream) = provider_with_stream();
    provider.initialize().await.expect("initialize");
    let log = EventLog::attach_standard(provider.events());

    let outcome = provider.handle_notification(&WalletNotification::new(
        "metamask_accountsChanged",
        json!(["0xB"]),
    ));

    assert_eq!(outcome, RouteOutcome::AccountsChanged);
    assert_eq!(
        log.all(),
        vec![ProviderEvent::AccountsChanged(vec!["0xB".to_owned()])]
    );
}

#[tokio::test]
async fn chain_notification_accepts_bare_and_object_forms() {
    let (provider, _stream) = provider_with_stream();
    provider.initialize().await.expect("initialize");
    let log = EventLog::attach_standard(provider.events());

    provider.handle_notification(&WalletNotification::new(
        "metamask_chainChanged",
        json!("0x5"),
    ));
    provider.handle_notification(&WalletNotification::new(
        "metamask_chainChanged",
        json!({ "chainId": "0x89", "networkVersion": "137" }),
    ));

    assert_eq!(
        log.all(),
        vec![
            ProviderEvent::ChainChanged(chain("0x5")),
            ProviderEvent::ChainChanged(chain("0x89")),
        ]
    );
}

#[test]
fn malformed_chain_notification_is_absorbed() {
    init_tracing();
    let (provider, _stream) = provider_with_stream();

    let outcome = provider.handle_notification(&WalletNotification::new(
        "metamask_chainChanged",
        json!({ "networkVersion": "1" }),
    ));

    assert_eq!(outcome, RouteOutcome::ChainChanged);
    assert_eq!(provider.chain_id(), None);
    assert!(!provider.is_connected());
}

#[test]
fn subscription_notifications_are_reemitted() {
    let (provider, _stream) = provider_with_stream();
    let log = EventLog::attach(
        provider.events(),
        &[EventName::Message, EventName::Data, EventName::Notification],
    );
    let params = json!({ "subscription": "0xabc", "result": { "number": "0x1" } });

    let outcome = provider.handle_notification(&WalletNotification::new(
        "eth_subscription",
        params.clone(),
    ));

    assert_eq!(outcome, RouteOutcome::Emitted);
    assert_eq!(
        log.all(),
        vec![
            ProviderEvent::Message {
                kind: "eth_subscription".to_owned(),
                data: params.clone(),
            },
            ProviderEvent::Data(json!({ "method": "eth_subscription", "params": params })),
            ProviderEvent::Notification(json!({ "number": "0x1" })),
        ]
    );
    assert_eq!(provider.snapshot(), Default::default());
}

#[test]
fn stream_failure_destroys_transport() {
    let (provider, stream) = provider_with_stream();

    let outcome = provider.handle_notification(&WalletNotification::new(
        "METAMASK_STREAM_FAILURE",
        json!(null),
    ));

    assert_eq!(outcome, RouteOutcome::StreamFailure);
    let destroyed = stream.destroyed();
    assert_eq!(destroyed.len(), 1);
    let ProviderError::Rpc(error) = &destroyed[0] else {
        panic!("unexpected destroy error: {:?}", destroyed[0]);
    };
    assert_eq!(error.code, codes::DISCONNECTED_PERMANENT);
    // The transport owns the follow-up disconnect.
    assert!(!provider.is_permanently_disconnected());
}

#[test]
fn unknown_notifications_are_ignored() {
    let (provider, stream) = provider_with_stream();
    let log = EventLog::attach_standard(provider.events());

    for method in ["metamask_unlockStateChanged", "wallet_somethingNew", ""] {
        let outcome = provider.handle_notification(&WalletNotification::new(method, json!({})));
        assert_eq!(outcome, RouteOutcome::Ignored);
    }

    assert!(log.all().is_empty());
    assert!(stream.destroyed().is_empty());
}

#[test]
fn router_method_names_are_configurable() {
    let stream = Arc::new(RecordingStream::default());
    let provider = InpageProvider::new(
        ScriptedEngine::default(),
        stream,
        ProviderOptions {
            router: RouterConfig {
                accounts_changed_method: "wallet_accountsChanged".to_owned(),
                chain_changed_method: "wallet_chainChanged".to_owned(),
                stream_failure_method: "WALLET_STREAM_FAILURE".to_owned(),
                emitted_notifications: vec!["eth_subscription".to_owned(), "wallet_notify".to_owned()],
            },
            ..ProviderOptions::default()
        },
    );

    assert_eq!(
        provider.handle_notification(&WalletNotification::new(
            "wallet_chainChanged",
            json!("0x1")
        )),
        RouteOutcome::ChainChanged
    );
    assert_eq!(
        provider.handle_notification(&WalletNotification::new("wallet_notify", json!({}))),
        RouteOutcome::Emitted
    );
    assert_eq!(
        provider.handle_notification(&WalletNotification::new(
            "metamask_chainChanged",
            json!("0x2")
        )),
        RouteOutcome::Ignored
    );
    assert_eq!(provider.chain_id(), Some(chain("0x1")));
}
