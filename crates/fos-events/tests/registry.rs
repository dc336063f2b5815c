//! Event registry scenarios: delegation, unbinding granularity, namespaces,
//! triggering and deferred attachment.

use std::cell::RefCell;
use std::rc::Rc;

use fos_dom::{Document, Event, EventTarget, NodeId, ShadowRootMode};
use fos_events::{BindOptions, EventMap, EventRegistry, Listener};
use serde_json::json;

type Log = Rc<RefCell<Vec<String>>>;

/// body > ul.menu > li.item > a.link > span
struct Fixture {
    doc: Document,
    events: EventRegistry,
    menu: NodeId,
    item: NodeId,
    link: NodeId,
    span: NodeId,
}

fn fixture() -> Fixture {
    let doc = Document::default();
    let events = EventRegistry::new(&doc);
    let menu = doc.create_element("ul");
    let item = doc.create_element("li");
    let link = doc.create_element("a");
    let span = doc.create_element("span");
    doc.set_attribute(menu, "class", "menu").unwrap();
    doc.set_attribute(item, "class", "item").unwrap();
    doc.set_attribute(link, "class", "link").unwrap();
    doc.append_child(doc.body(), menu).unwrap();
    doc.append_child(menu, item).unwrap();
    doc.append_child(item, link).unwrap();
    doc.append_child(link, span).unwrap();
    Fixture { doc, events, menu, item, link, span }
}

fn recorder(log: &Log, label: &str) -> Listener {
    let log = log.clone();
    let label = label.to_string();
    Listener::new(move |_evt| log.borrow_mut().push(label.clone()))
}

fn select_target_recorder(log: &Rc<RefCell<Vec<Option<NodeId>>>>) -> Listener {
    let log = log.clone();
    Listener::new(move |evt| log.borrow_mut().push(evt.select_target))
}

#[test]
fn test_delegation_selects_nearest_match() {
    let f = fixture();
    let seen = Rc::default();
    f.events
        .bind(f.menu, "click", Some(".item"), &select_target_recorder(&seen), BindOptions::new())
        .unwrap();

    f.doc.dispatch_event(f.span, Event::bubbling("click"));
    f.doc.dispatch_event(f.item, Event::bubbling("click"));
    assert_eq!(*seen.borrow(), vec![Some(f.item), Some(f.item)]);
}

#[test]
fn test_delegation_origin_match_wins() {
    let f = fixture();
    let seen = Rc::default();
    f.events
        .bind(f.menu, "click", Some("a, li"), &select_target_recorder(&seen), BindOptions::new())
        .unwrap();

    f.doc.dispatch_event(f.link, Event::bubbling("click"));
    assert_eq!(*seen.borrow(), vec![Some(f.link)]);
}

#[test]
fn test_delegation_without_match_does_not_fire() {
    let f = fixture();
    let log: Log = Rc::default();
    f.events
        .bind(f.menu, "click", Some(".missing"), &recorder(&log, "hit"), BindOptions::new())
        .unwrap();
    // ancestors at or above the bound target never count
    f.events
        .bind(f.item, "click", Some(".menu"), &recorder(&log, "outer"), BindOptions::new())
        .unwrap();

    f.doc.dispatch_event(f.span, Event::bubbling("click"));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_delegation_matches_shadow_host() {
    let f = fixture();
    let card = f.doc.create_element("x-card");
    f.doc.set_attribute(card, "class", "item").unwrap();
    let shadow = f.doc.attach_shadow(card, ShadowRootMode::Open).unwrap();
    let button = f.doc.create_element("button");
    f.doc.append_child(shadow, button).unwrap();
    f.doc.append_child(f.menu, card).unwrap();

    let outside = Rc::default();
    let inside = Rc::default();
    let targets: Rc<RefCell<Vec<Option<EventTarget>>>> = Rc::default();
    f.events
        .bind(f.menu, "click", Some(".item"), &select_target_recorder(&outside), BindOptions::new())
        .unwrap();
    f.events
        .bind(shadow, "click", Some("button"), &select_target_recorder(&inside), BindOptions::new())
        .unwrap();
    let log = targets.clone();
    f.events
        .bind(EventTarget::DOCUMENT, "click", None, &Listener::new(move |evt| log.borrow_mut().push(evt.target())), BindOptions::new())
        .unwrap();

    f.doc.dispatch_event(button, Event::bubbling("click"));
    assert_eq!(*outside.borrow(), vec![Some(card)]);
    assert_eq!(*inside.borrow(), vec![Some(button)]);
    assert_eq!(*targets.borrow(), vec![Some(EventTarget::Node(card))]);
}

#[test]
fn test_listeners_on_same_key_all_fire_in_order() {
    let f = fixture();
    let log: Log = Rc::default();
    for label in ["first", "second", "third"] {
        f.events
            .bind(f.menu, "click", Some(".link"), &recorder(&log, label), BindOptions::new())
            .unwrap();
    }
    f.doc.dispatch_event(f.span, Event::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn test_unbind_exact_listener() {
    let f = fixture();
    let log: Log = Rc::default();
    let l1 = recorder(&log, "l1");
    let l2 = recorder(&log, "l2");
    f.events.bind(f.menu, "click", Some(".link"), &l1, BindOptions::new()).unwrap();
    f.events.bind(f.menu, "click", Some(".link"), &l2, BindOptions::new()).unwrap();

    f.events.unbind(f.menu, Some("click"), Some(".link"), Some(&l1));
    f.doc.dispatch_event(f.link, Event::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["l2"]);

    // a second removal of the same listener is a warning, not an error
    f.events.unbind(f.menu, Some("click"), Some(".link"), Some(&l1));
    assert_eq!(f.events.registration_count(f.menu), 1);
}

#[test]
fn test_unbind_granularities() {
    let f = fixture();
    let log: Log = Rc::default();
    let plain = recorder(&log, "plain");
    let delegated = recorder(&log, "delegated");
    let keyup = recorder(&log, "keyup");
    f.events.bind(f.menu, "click", None, &plain, BindOptions::new()).unwrap();
    f.events.bind(f.menu, "click", Some(".item"), &delegated, BindOptions::new()).unwrap();
    f.events.bind(f.menu, "keyup", None, &keyup, BindOptions::new()).unwrap();

    // type + selector leaves the plain click binding
    f.events.unbind(f.menu, Some("click"), Some(".item"), None);
    assert_eq!(f.events.registration_count(f.menu), 2);

    f.events.bind(f.menu, "click", Some(".item"), &delegated, BindOptions::new()).unwrap();
    // type alone covers every selector
    f.events.unbind(f.menu, Some("click"), None, None);
    assert_eq!(f.events.registration_count(f.menu), 1);

    // nothing at all clears the target
    f.events.unbind(f.menu, None, None, None);
    assert_eq!(f.events.registration_count(f.menu), 0);
    assert_eq!(f.doc.listener_count(f.menu, None), 0);

    f.doc.dispatch_event(f.item, Event::bubbling("click"));
    f.doc.dispatch_event(f.item, Event::bubbling("keyup"));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_namespace_bulk_removal_leaves_other_namespaces() {
    let f = fixture();
    let log: Log = Rc::default();
    for i in 0..4 {
        let listener = recorder(&log, &format!("x{i}"));
        f.events
            .bind(f.menu, "click, keyup", Some(".item"), &listener, BindOptions::new().namespace("X"))
            .unwrap();
    }
    f.events
        .bind(f.menu, "click", None, &recorder(&log, "y"), BindOptions::new().namespace("Y"))
        .unwrap();
    assert_eq!(f.events.namespace_count(f.menu, "X"), 8);

    f.events.unbind_namespace(f.menu, "X");
    f.events.unbind_namespace(f.menu, "never-used");
    assert_eq!(f.events.namespace_count(f.menu, "X"), 0);
    assert_eq!(f.events.namespace_count(f.menu, "Y"), 1);

    f.doc.dispatch_event(f.item, Event::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["y"]);
}

#[test]
fn test_multiple_targets_and_types() {
    let f = fixture();
    let log: Log = Rc::default();
    let listener = recorder(&log, "hit");
    f.events
        .bind([f.item, f.link], " click , keyup ", None, &listener, BindOptions::new())
        .unwrap();
    assert_eq!(f.events.registration_count(f.item), 2);
    assert_eq!(f.events.registration_count(f.link), 2);

    f.events.unbind(vec![f.item, f.link], Some("keyup"), None, Some(&listener));
    assert_eq!(f.events.registration_count(f.item), 1);
    assert_eq!(f.events.registration_count(f.link), 1);
}

#[test]
fn test_trigger_sets_detail_and_select_target() {
    let f = fixture();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let listener = {
        let seen = seen.clone();
        Listener::new(move |evt| {
            seen.borrow_mut().push((evt.select_target, evt.detail.clone(), evt.bubbles, evt.cancelable))
        })
    };
    f.events.bind(f.menu, "item-selected", None, &listener, BindOptions::new()).unwrap();

    f.events.trigger(f.item, "item-selected", Some(json!({ "id": 7 })));
    assert_eq!(*seen.borrow(), vec![(Some(f.item), Some(json!({ "id": 7 })), true, true)]);
}

#[test]
fn test_context_receiver_and_dropped_context() {
    struct Panel {
        name: String,
        log: Log,
    }
    let f = fixture();
    let log: Log = Rc::default();
    let panel = Rc::new(Panel { name: "panel".into(), log: log.clone() });
    let listener = Listener::method(|panel: &Panel, evt: &mut Event| {
        panel.log.borrow_mut().push(format!("{}:{}", panel.name, evt.event_type()));
    });
    f.events
        .bind(f.menu, "click", Some(".link"), &listener, BindOptions::new().context(&panel))
        .unwrap();

    f.doc.dispatch_event(f.link, Event::bubbling("click"));
    drop(panel);
    f.doc.dispatch_event(f.link, Event::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["panel:click"]);
}

#[test]
fn test_next_frame_defers_attachment() {
    let f = fixture();
    let log: Log = Rc::default();
    f.events
        .bind(EventTarget::Window, "resize", None, &recorder(&log, "resize"), BindOptions::new().next_frame())
        .unwrap();
    assert_eq!(f.events.registration_count(EventTarget::Window), 1);

    f.doc.dispatch_event(EventTarget::Window, Event::new("resize"));
    assert!(log.borrow().is_empty());

    f.doc.run_animation_frame();
    f.doc.dispatch_event(EventTarget::Window, Event::new("resize"));
    assert_eq!(*log.borrow(), vec!["resize"]);
}

#[test]
fn test_unbind_before_frame_cancels_deferred_attach() {
    let f = fixture();
    let log: Log = Rc::default();
    f.events
        .bind(
            EventTarget::DOCUMENT,
            "click",
            None,
            &recorder(&log, "late"),
            BindOptions::new().namespace("n").next_frame(),
        )
        .unwrap();
    f.events.unbind_namespace(EventTarget::DOCUMENT, "n");
    f.doc.run_animation_frame();

    f.doc.dispatch_event(f.link, Event::bubbling("click"));
    assert!(log.borrow().is_empty());
    assert_eq!(f.doc.listener_count(EventTarget::DOCUMENT, None), 0);
}

#[test]
fn test_skip_if_detached() {
    let f = fixture();
    let log: Log = Rc::default();
    f.events
        .bind(
            EventTarget::DOCUMENT,
            "click",
            None,
            &recorder(&log, "doc"),
            BindOptions::new().skip_if_detached(f.item),
        )
        .unwrap();

    f.doc.dispatch_event(f.doc.body(), Event::bubbling("click"));
    f.doc.remove(f.item).unwrap();
    f.doc.dispatch_event(f.doc.body(), Event::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["doc"]);
}

#[test]
fn test_reentrant_unbind_from_listener() {
    let f = fixture();
    let log: Log = Rc::default();
    let second = recorder(&log, "second");
    let first = {
        let events = f.events.clone();
        let second = second.clone();
        let log = log.clone();
        let menu = f.menu;
        Listener::new(move |_evt| {
            log.borrow_mut().push("first".into());
            events.unbind(menu, Some("click"), None, Some(&second));
        })
    };
    f.events.bind(f.menu, "click", None, &first, BindOptions::new()).unwrap();
    f.events.bind(f.menu, "click", None, &second, BindOptions::new()).unwrap();

    f.doc.dispatch_event(f.menu, Event::bubbling("click"));
    f.doc.dispatch_event(f.menu, Event::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["first", "first"]);
    assert_eq!(f.events.registration_count(f.menu), 1);
}

#[test]
fn test_bind_map() {
    let f = fixture();
    let log: Log = Rc::default();
    let map = EventMap::new()
        .on("click; .link", recorder(&log, "link"))
        .on("keyup, keydown", recorder(&log, "key"));
    f.events.bind_map(f.menu, &map, &BindOptions::new().namespace("map")).unwrap();
    assert_eq!(f.events.namespace_count(f.menu, "map"), 3);

    f.doc.dispatch_event(f.span, Event::bubbling("click"));
    f.doc.dispatch_event(f.span, Event::bubbling("keydown"));
    assert_eq!(*log.borrow(), vec!["link", "key"]);
}
