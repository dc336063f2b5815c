//! Hub scenarios: fan-out ordering, isolation, namespaces and re-entrancy.

use std::cell::RefCell;
use std::rc::Rc;

use fos_hub::{HubBindings, HubError, HubEventInfo, HubHandler, HubRegistry, SubscribeOptions, Value};
use serde_json::json;

type Log = Rc<RefCell<Vec<String>>>;

fn recorder(log: &Log, name: &str) -> HubHandler {
    let log = log.clone();
    let name = name.to_string();
    HubHandler::new(move |payload: &Value, info: &HubEventInfo| {
        let label = info.label.as_deref().unwrap_or("-");
        log.borrow_mut().push(format!("{name}:{}:{label}:{payload}", info.topic));
    })
}

#[test]
fn test_label_subscribers_before_topic_subscribers() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();
    hub.subscribe("T", None, &recorder(&log, "A"), SubscribeOptions::new()).unwrap();
    hub.subscribe("T", Some("lbl"), &recorder(&log, "B"), SubscribeOptions::new()).unwrap();

    hub.publish("T", Some("lbl"), &json!(1));
    assert_eq!(*log.borrow(), vec!["B:T:lbl:1", "A:T:lbl:1"]);
}

#[test]
fn test_label_subscriber_ignores_other_labels() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();
    hub.subscribe("T", Some("create"), &recorder(&log, "create"), SubscribeOptions::new()).unwrap();

    hub.publish("T", Some("delete"), &json!(null));
    hub.publish("T", None, &json!(null));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_topic_only_subscriber_sees_every_label() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();
    hub.subscribe("Task", None, &recorder(&log, "all"), SubscribeOptions::new()).unwrap();
    hub.subscribe("Task", Some("update"), &recorder(&log, "upd"), SubscribeOptions::new()).unwrap();

    hub.publish("Task", Some("create, update"), &json!("x"));
    hub.publish("Task", None, &json!("y"));
    assert_eq!(
        *log.borrow(),
        vec![
            "upd:Task:update:\"x\"",
            "all:Task:create:\"x\"",
            "all:Task:update:\"x\"",
            "all:Task:-:\"y\"",
        ]
    );
}

#[test]
fn test_multiple_topics_and_registration_order() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();
    hub.subscribe("a, b", None, &recorder(&log, "first"), SubscribeOptions::new()).unwrap();
    hub.subscribe("a", None, &recorder(&log, "second"), SubscribeOptions::new()).unwrap();

    hub.publish(" a , b ", None, &json!(0));
    assert_eq!(*log.borrow(), vec!["first:a:-:0", "second:a:-:0", "first:b:-:0"]);
}

#[test]
fn test_hub_isolation() {
    let hubs = HubRegistry::new();
    let log: Log = Rc::default();
    hubs.get_or_create("A").unwrap().subscribe("T", None, &recorder(&log, "a"), SubscribeOptions::new()).unwrap();
    hubs.get_or_create("B").unwrap().subscribe("T", None, &recorder(&log, "b"), SubscribeOptions::new()).unwrap();

    hubs.get_or_create("A").unwrap().publish("T", None, &json!(true));
    assert_eq!(*log.borrow(), vec!["a:T:-:true"]);
}

#[test]
fn test_publish_without_subscribers_is_noop() {
    let hubs = HubRegistry::new();
    hubs.get_or_create("empty").unwrap().publish("nothing", Some("here"), &json!({}));
}

#[test]
fn test_namespace_unsubscribe() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();
    hub.subscribe("T", None, &recorder(&log, "x1"), SubscribeOptions::new().namespace("X")).unwrap();
    hub.subscribe("T", Some("l"), &recorder(&log, "x2"), SubscribeOptions::new().namespace("X")).unwrap();
    hub.subscribe("T", None, &recorder(&log, "y"), SubscribeOptions::new().namespace("Y")).unwrap();

    hub.unsubscribe("X").unwrap();
    assert_eq!(hub.namespace_count("X"), 0);
    hub.publish("T", Some("l"), &json!(1));
    assert_eq!(*log.borrow(), vec!["y:T:l:1"]);

    assert_eq!(hub.unsubscribe(" "), Err(HubError::MissingNamespace));
}

#[test]
fn test_reentrant_publish() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();

    let relay = {
        let hub = hub.clone();
        let log = log.clone();
        HubHandler::new(move |payload, _info| {
            log.borrow_mut().push("relay".into());
            hub.publish("echo", None, payload);
        })
    };
    hub.subscribe("ping", None, &relay, SubscribeOptions::new()).unwrap();
    hub.subscribe("echo", None, &recorder(&log, "echo"), SubscribeOptions::new()).unwrap();

    hub.publish("ping", None, &json!(5));
    assert_eq!(*log.borrow(), vec!["relay", "echo:echo:-:5"]);
}

#[test]
fn test_unsubscribe_during_publish_skips_remaining() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();

    let killer = {
        let hub = hub.clone();
        let log = log.clone();
        HubHandler::new(move |_payload, _info| {
            log.borrow_mut().push("killer".into());
            hub.unsubscribe("victims").unwrap();
        })
    };
    hub.subscribe("T", None, &killer, SubscribeOptions::new()).unwrap();
    hub.subscribe("T", None, &recorder(&log, "victim"), SubscribeOptions::new().namespace("victims")).unwrap();

    hub.publish("T", None, &json!(0));
    assert_eq!(*log.borrow(), vec!["killer"]);
}

#[test]
fn test_subscribe_during_publish_waits_for_next_publish() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();

    let late = recorder(&log, "late");
    let adder = {
        let hub = hub.clone();
        HubHandler::new(move |_payload, _info| {
            hub.subscribe("T", None, &late, SubscribeOptions::new().namespace("late")).unwrap();
        })
    };
    hub.subscribe("T", None, &adder, SubscribeOptions::new().namespace("adder")).unwrap();

    hub.publish("T", None, &json!(1));
    assert!(log.borrow().is_empty());
    hub.unsubscribe("adder").unwrap();
    hub.publish("T", None, &json!(2));
    assert_eq!(*log.borrow(), vec!["late:T:-:2"]);
}

#[test]
fn test_method_handler_and_context_lifetime() {
    struct Store {
        log: Log,
    }
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let log: Log = Rc::default();
    let store = Rc::new(Store { log: log.clone() });

    let handler = HubHandler::method(|store: &Store, payload: &Value, info: &HubEventInfo| {
        store.log.borrow_mut().push(format!("{}={payload}", info.topic));
    });
    assert_eq!(
        hub.subscribe("T", None, &handler, SubscribeOptions::new()),
        Err(HubError::MissingContext { topic: "T".into() })
    );
    hub.subscribe("T", None, &handler, SubscribeOptions::new().context(&store).namespace("store")).unwrap();

    hub.publish("T", None, &json!(1));
    drop(store);
    hub.publish("T", None, &json!(2));
    assert_eq!(*log.borrow(), vec!["T=1"]);
}

#[test]
fn test_info_carries_namespace() {
    let hubs = HubRegistry::new();
    let hub = hubs.get_or_create("data").unwrap();
    let seen = Rc::new(RefCell::new(None));
    let handler = {
        let seen = seen.clone();
        HubHandler::new(move |_payload, info| *seen.borrow_mut() = Some(info.clone()))
    };
    hub.subscribe("T", Some("l"), &handler, SubscribeOptions::new().namespace("c_uid_1")).unwrap();
    hub.publish("T", Some("l"), &json!(null));
    assert_eq!(
        seen.borrow().clone(),
        Some(HubEventInfo { topic: "T".into(), label: Some("l".into()), namespace: Some("c_uid_1".into()) })
    );
}

#[test]
fn test_bind_and_unbind_hub_events() {
    let hubs = HubRegistry::new();
    let log: Log = Rc::default();
    let bindings = HubBindings::new()
        .on("dataHub; Task; create", recorder(&log, "task"))
        .for_hub("uiHub", "Theme", recorder(&log, "theme"));
    let options = SubscribeOptions::new().namespace("ns1");

    hubs.bind_hub_events(&bindings, &options).unwrap();
    hubs.get_or_create("dataHub").unwrap().publish("Task", Some("create"), &json!(1));
    hubs.get_or_create("uiHub").unwrap().publish("Theme", None, &json!("dark"));
    assert_eq!(*log.borrow(), vec!["task:Task:create:1", "theme:Theme:-:\"dark\""]);

    hubs.unbind_hub_events(&bindings, "ns1").unwrap();
    assert_eq!(hubs.get_or_create("dataHub").unwrap().subscription_count("Task", Some("create")), 0);
    assert_eq!(hubs.get_or_create("uiHub").unwrap().subscription_count("Theme", None), 0);
}

#[test]
fn test_invalid_binding_key_subscribes_nothing() {
    let hubs = HubRegistry::new();
    let handler = HubHandler::new(|_, _| {});
    let bindings = HubBindings::new().on("good; T", handler.clone()).on("no-topics", handler);

    assert_eq!(
        hubs.bind_hub_events(&bindings, &SubscribeOptions::new()),
        Err(HubError::InvalidBindingKey("no-topics".into()))
    );
    assert!(hubs.get("good").is_none());
}
