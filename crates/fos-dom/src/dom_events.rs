//! DOM Events
//!
//! Event objects and the per-target native listener store.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::{EventTarget, NodeId};

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// `CustomEventInit`-style construction options
#[derive(Debug, Clone, Default)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub detail: Option<Value>,
}

impl EventInit {
    /// Bubbling, cancelable init as used for synthesized custom events
    pub fn custom(detail: Option<Value>) -> Self {
        Self { bubbles: true, cancelable: true, detail }
    }
}

/// DOM event
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    target: Option<EventTarget>,
    current_target: Option<EventTarget>,
    phase: EventPhase,
    pub bubbles: bool,
    pub cancelable: bool,
    /// Custom event payload
    pub detail: Option<Value>,
    /// Element matched by a delegated listener (or the trigger target)
    pub select_target: Option<NodeId>,
    pub timestamp: f64,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_stopped: bool,
    in_passive_listener: bool,
}

impl Event {
    /// Non-bubbling, non-cancelable event
    pub fn new(event_type: &str) -> Self {
        Self::with_init(event_type, EventInit::default())
    }

    /// Create an event from init options
    pub fn with_init(event_type: &str, init: EventInit) -> Self {
        Self {
            event_type: event_type.to_string(),
            target: None,
            current_target: None,
            phase: EventPhase::None,
            bubbles: init.bubbles,
            cancelable: init.cancelable,
            detail: init.detail,
            select_target: None,
            timestamp: 0.0,
            default_prevented: false,
            propagation_stopped: false,
            immediate_stopped: false,
            in_passive_listener: false,
        }
    }

    /// Bubbling, cancelable event (what a user click produces)
    pub fn bubbling(event_type: &str) -> Self {
        Self::with_init(event_type, EventInit { bubbles: true, cancelable: true, detail: None })
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Where the event was dispatched, retargeted to the shadow host the
    /// current listener can see when the origin sits in a shadow tree
    pub fn target(&self) -> Option<EventTarget> {
        self.target
    }

    /// The (retargeted) target when it is a node
    pub fn target_node(&self) -> Option<NodeId> {
        self.target.and_then(EventTarget::as_node)
    }

    /// The target whose listeners are currently running
    pub fn current_target(&self) -> Option<EventTarget> {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// Prevent default action (ignored for non-cancelable events and inside passive listeners)
    pub fn prevent_default(&mut self) {
        if self.cancelable && !self.in_passive_listener {
            self.default_prevented = true;
        }
    }

    /// Stop propagation after the current target
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop propagation and skip remaining listeners on the current target
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub(crate) fn is_immediate_stopped(&self) -> bool {
        self.immediate_stopped
    }

    pub(crate) fn begin(&mut self, target: EventTarget, timestamp: f64) {
        self.target = Some(target);
        self.timestamp = timestamp;
    }

    pub(crate) fn enter(&mut self, current: EventTarget, target: EventTarget, phase: EventPhase) {
        self.current_target = Some(current);
        self.target = Some(target);
        self.phase = phase;
    }

    pub(crate) fn finish(&mut self) {
        self.current_target = None;
        self.phase = EventPhase::None;
        self.in_passive_listener = false;
    }

    pub(crate) fn set_passive(&mut self, passive: bool) {
        self.in_passive_listener = passive;
    }
}

/// Callback attached to a target with `add_event_listener`
pub type NativeListener = Rc<dyn Fn(&mut Event)>;

/// `AddEventListenerOptions`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
    pub passive: bool,
    pub once: bool,
}

/// Handle returned by `add_event_listener`, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub id: ListenerId,
    pub event_type: String,
    pub options: ListenerOptions,
    pub callback: NativeListener,
    /// Set on removal so dispatch snapshots skip it
    pub removed: Rc<Cell<bool>>,
}

/// Native listeners by target, in registration order
#[derive(Default)]
pub(crate) struct ListenerStore {
    by_target: HashMap<EventTarget, Vec<ListenerEntry>>,
    next_id: u64,
}

impl ListenerStore {
    pub fn add(
        &mut self,
        target: EventTarget,
        event_type: &str,
        callback: NativeListener,
        options: ListenerOptions,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.by_target.entry(target).or_default().push(ListenerEntry {
            id,
            event_type: event_type.to_string(),
            options,
            callback,
            removed: Rc::new(Cell::new(false)),
        });
        id
    }

    pub fn remove(&mut self, target: EventTarget, id: ListenerId) -> bool {
        let Some(entries) = self.by_target.get_mut(&target) else {
            return false;
        };
        let Some(idx) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let entry = entries.remove(idx);
        entry.removed.set(true);
        if entries.is_empty() {
            self.by_target.remove(&target);
        }
        true
    }

    /// Snapshot of listeners for one phase. `capture: None` takes both.
    pub fn snapshot(&self, target: EventTarget, event_type: &str, capture: Option<bool>) -> Vec<ListenerEntry> {
        self.by_target
            .get(&target)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.event_type == event_type)
                    .filter(|e| capture.is_none_or(|c| e.options.capture == c))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count(&self, target: EventTarget, event_type: Option<&str>) -> usize {
        self.by_target
            .get(&target)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| event_type.is_none_or(|t| e.event_type == t))
                    .count()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prevent_default_rules() {
        let mut plain = Event::new("x");
        plain.prevent_default();
        assert!(!plain.is_default_prevented());

        let mut evt = Event::bubbling("click");
        evt.set_passive(true);
        evt.prevent_default();
        assert!(!evt.is_default_prevented());
        evt.set_passive(false);
        evt.prevent_default();
        assert!(evt.is_default_prevented());
    }

    #[test]
    fn test_store_snapshot_and_remove() {
        let mut store = ListenerStore::default();
        let target = EventTarget::Window;
        let cb: NativeListener = Rc::new(|_| {});
        let a = store.add(target, "resize", cb.clone(), ListenerOptions::default());
        let _b = store.add(target, "resize", cb, ListenerOptions { capture: true, ..Default::default() });

        assert_eq!(store.snapshot(target, "resize", None).len(), 2);
        assert_eq!(store.snapshot(target, "resize", Some(true)).len(), 1);

        let snap = store.snapshot(target, "resize", Some(false));
        assert!(store.remove(target, a));
        assert!(snap[0].removed.get());
        assert!(!store.remove(target, a));
        assert_eq!(store.count(target, Some("resize")), 1);
    }
}
