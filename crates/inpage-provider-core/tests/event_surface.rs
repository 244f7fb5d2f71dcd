use std::sync::{Arc, Mutex};

use serde_json::json;

use inpage_provider_core::{
    EventName, EventSurface, ProviderEvent, WarningKey, WarningLedger,
};

fn message(tag: u64) -> ProviderEvent {
    ProviderEvent::Message {
        kind: "eth_subscription".to_owned(),
        data: json!(tag),
    }
}

fn recorder(surface: &EventSurface, event: EventName, label: &'static str, seen: &Arc<Mutex<Vec<String>>>) {
    let seen = Arc::clone(seen);
    surface.on(event, move |_| seen.lock().expect("seen lock").push(label.to_owned()));
}

#[test]
fn prepend_runs_before_existing_listeners() {
    let surface = EventSurface::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    recorder(&surface, EventName::Message, "first", &seen);
    {
        let seen = Arc::clone(&seen);
        surface.prepend_listener(EventName::Message, move |_| {
            seen.lock().expect("seen lock").push("prepended".to_owned())
        });
    }

    assert!(surface.emit(&message(1)));
    assert_eq!(
        *seen.lock().expect("seen lock"),
        vec!["prepended".to_owned(), "first".to_owned()]
    );
}

#[test]
fn once_listeners_fire_a_single_time() {
    let surface = EventSurface::default();
    let hits = Arc::new(Mutex::new(0));
    for prepend in [false, true] {
        let hits = Arc::clone(&hits);
        let listener = move |_: &ProviderEvent| *hits.lock().expect("hits lock") += 1;
        if prepend {
            surface.prepend_once_listener(EventName::Message, listener);
        } else {
            surface.once(EventName::Message, listener);
        }
    }

    surface.emit(&message(1));
    surface.emit(&message(2));

    assert_eq!(*hits.lock().expect("hits lock"), 2);
    assert_eq!(surface.listener_count(EventName::Message), 0);
}

#[test]
fn late_subscribers_get_no_replay() {
    let surface = EventSurface::default();
    assert!(!surface.emit(&message(1)));

    let seen = Arc::new(Mutex::new(Vec::new()));
    recorder(&surface, EventName::Message, "late", &seen);

    assert!(seen.lock().expect("seen lock").is_empty());
}

#[test]
fn remove_listener_by_id() {
    let surface = EventSurface::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let id = {
        let seen = Arc::clone(&seen);
        surface.add_listener(EventName::Message, move |_| {
            seen.lock().expect("seen lock").push("removed".to_owned())
        })
    };
    recorder(&surface, EventName::Message, "kept", &seen);

    assert!(surface.remove_listener(EventName::Message, id));
    assert!(!surface.remove_listener(EventName::Message, id));
    surface.emit(&message(1));

    assert_eq!(*seen.lock().expect("seen lock"), vec!["kept".to_owned()]);

    surface.remove_all_listeners(Some(EventName::Message));
    assert_eq!(surface.listener_count(EventName::Message), 0);
}

#[test]
fn legacy_event_subscription_warns_once_per_name() {
    let ledger = WarningLedger::default();
    let surface = EventSurface::new(ledger.clone(), 0);

    surface.on(EventName::Close, |_| {});
    assert!(ledger.has_sent(WarningKey::CloseEvent));
    assert!(!ledger.has_sent(WarningKey::DataEvent));

    surface.once(EventName::Data, |_| {});
    surface.prepend_listener(EventName::Notification, |_| {});
    surface.prepend_once_listener(EventName::NetworkChanged, |_| {});
    for key in [
        WarningKey::DataEvent,
        WarningKey::NotificationEvent,
        WarningKey::NetworkChangedEvent,
    ] {
        assert!(ledger.has_sent(key));
    }

    // Already warned: the ledger reports no fresh warning.
    assert!(!ledger.warn_once(WarningKey::CloseEvent));
    surface.on(EventName::Close, |_| {});
    assert_eq!(surface.listener_count(EventName::Close), 2);
}

#[test]
fn standard_events_do_not_warn() {
    let ledger = WarningLedger::default();
    let surface = EventSurface::new(ledger.clone(), 0);

    for name in [
        EventName::Connect,
        EventName::Disconnect,
        EventName::ChainChanged,
        EventName::AccountsChanged,
        EventName::Message,
    ] {
        surface.on(name, |_| {});
        assert_eq!(name.deprecation(), None);
    }
    assert!(!ledger.has_sent(WarningKey::CloseEvent));
}

#[test]
fn listener_bound_does_not_reject_subscriptions() {
    let surface = EventSurface::new(WarningLedger::default(), 2);
    for _ in 0..4 {
        surface.on(EventName::AccountsChanged, |_| {});
    }
    assert_eq!(surface.listener_count(EventName::AccountsChanged), 4);
}

#[test]
fn listener_may_unsubscribe_itself_during_emit() {
    let surface = Arc::new(EventSurface::default());
    let id_slot = Arc::new(Mutex::new(None));
    let hits = Arc::new(Mutex::new(0));
    let id = {
        let surface_ref = Arc::clone(&surface);
        let id_slot = Arc::clone(&id_slot);
        let hits = Arc::clone(&hits);
        surface.on(EventName::Message, move |_| {
            *hits.lock().expect("hits lock") += 1;
            if let Some(id) = *id_slot.lock().expect("id lock") {
                surface_ref.remove_listener(EventName::Message, id);
            }
        })
    };
    *id_slot.lock().expect("id lock") = Some(id);

    surface.emit(&message(1));
    surface.emit(&message(2));

    assert_eq!(*hits.lock().expect("hits lock"), 1);
}

#[test]
fn event_names_round_trip_through_strings() {
    for name in [
        EventName::Connect,
        EventName::Disconnect,
        EventName::ChainChanged,
        EventName::AccountsChanged,
        EventName::Message,
        EventName::Initialized,
        EventName::Close,
        EventName::Data,
        EventName::NetworkChanged,
        EventName::Notification,
    ] {
        assert_eq!(EventName::parse(name.as_str()), Some(name));
    }
    assert_eq!(EventName::parse("error"), None);
}
