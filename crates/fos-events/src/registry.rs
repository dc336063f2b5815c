//! Event registry
//!
//! Per target, registrations are indexed twice: by `(type, selector)` with
//! one entry per listener identity, and by namespace. Both indices always
//! hold the same set of registrations.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use fos_dom::{
    Document, Event, EventInit, EventTarget, ListenerId, ListenerOptions, NativeListener, NodeId,
    Selector,
};
use serde_json::Value;

use crate::{split_list, BindOptions, EventError, IntoTargets, Listener};

/// `(type, selector)` lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    event_type: String,
    selector: Option<String>,
}

impl BindingKey {
    fn new(event_type: &str, selector: Option<&str>) -> Self {
        Self {
            event_type: event_type.to_string(),
            selector: selector.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NativeState {
    /// Waiting for the next animation frame
    Pending,
    Attached(ListenerId),
    Detached,
}

/// One active binding
struct Registration {
    key: BindingKey,
    listener: Listener,
    namespace: Option<String>,
    native: Cell<NativeState>,
}

#[derive(Default)]
struct TargetTable {
    by_key: HashMap<BindingKey, Vec<Rc<Registration>>>,
    by_namespace: HashMap<String, Vec<Rc<Registration>>>,
}

impl TargetTable {
    fn insert(&mut self, registration: Rc<Registration>) {
        if let Some(ns) = &registration.namespace {
            self.by_namespace.entry(ns.clone()).or_default().push(registration.clone());
        }
        self.by_key.entry(registration.key.clone()).or_default().push(registration);
    }

    /// Remove the registration for exactly this listener
    fn take_listener(&mut self, key: &BindingKey, listener: &Listener) -> Option<Rc<Registration>> {
        let entries = self.by_key.get_mut(key)?;
        let idx = entries.iter().position(|r| r.listener.ptr_eq(listener))?;
        let registration = entries.remove(idx);
        if entries.is_empty() {
            self.by_key.remove(key);
        }
        self.forget_namespace(&registration);
        Some(registration)
    }

    fn take_key(&mut self, key: &BindingKey) -> Vec<Rc<Registration>> {
        let taken = self.by_key.remove(key).unwrap_or_default();
        for registration in &taken {
            self.forget_namespace(registration);
        }
        taken
    }

    /// Every selector variant of one event type
    fn take_type(&mut self, event_type: &str) -> Vec<Rc<Registration>> {
        let keys: Vec<BindingKey> = self
            .by_key
            .keys()
            .filter(|k| k.event_type == event_type)
            .cloned()
            .collect();
        keys.iter().flat_map(|k| self.take_key(k)).collect()
    }

    fn take_all(&mut self) -> Vec<Rc<Registration>> {
        self.by_namespace.clear();
        self.by_key.drain().flat_map(|(_, entries)| entries).collect()
    }

    fn take_namespace(&mut self, namespace: &str) -> Vec<Rc<Registration>> {
        let taken = self.by_namespace.remove(namespace).unwrap_or_default();
        for registration in &taken {
            if let Some(entries) = self.by_key.get_mut(&registration.key) {
                entries.retain(|r| !Rc::ptr_eq(r, registration));
                if entries.is_empty() {
                    self.by_key.remove(&registration.key);
                }
            }
        }
        taken
    }

    fn forget_namespace(&mut self, registration: &Rc<Registration>) {
        let Some(ns) = &registration.namespace else { return };
        if let Some(entries) = self.by_namespace.get_mut(ns) {
            entries.retain(|r| !Rc::ptr_eq(r, registration));
            if entries.is_empty() {
                self.by_namespace.remove(ns);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

struct RegistryInner {
    document: Document,
    tables: RefCell<HashMap<EventTarget, TargetTable>>,
}

/// Namespace-scoped event registry over one document
#[derive(Clone)]
pub struct EventRegistry {
    inner: Rc<RegistryInner>,
}

impl EventRegistry {
    pub fn new(document: &Document) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                document: document.clone(),
                tables: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Bind `listener` for each comma-separated type in `types` on every target.
    ///
    /// With a `selector`, the native listener only calls `listener` when the
    /// event origin, or an ancestor below the bound target, matches it, and
    /// sets `Event::select_target` to that element for the call. Binding the
    /// same listener again for the same target, type and selector replaces the
    /// previous registration.
    pub fn bind(
        &self,
        targets: impl IntoTargets,
        types: &str,
        selector: Option<&str>,
        listener: &Listener,
        options: BindOptions,
    ) -> Result<(), EventError> {
        let targets = targets.into_targets();
        if targets.is_empty() {
            return Ok(());
        }

        let selector = match selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(Selector::parse(s).map_err(|source| EventError::InvalidSelector {
                selector: s.to_string(),
                source,
            })?),
            None => None,
        };
        if listener.needs_context() && options.context.is_none() {
            return Err(EventError::MissingContext { event_type: types.to_string() });
        }

        for event_type in split_list(types) {
            for &target in &targets {
                self.bind_one(target, event_type, selector.as_ref(), listener, &options);
            }
        }
        Ok(())
    }

    fn bind_one(
        &self,
        target: EventTarget,
        event_type: &str,
        selector: Option<&Selector>,
        listener: &Listener,
        options: &BindOptions,
    ) {
        let key = BindingKey::new(event_type, selector.map(Selector::as_str));

        let replaced = self
            .inner
            .tables
            .borrow_mut()
            .get_mut(&target)
            .and_then(|table| table.take_listener(&key, listener));
        if let Some(previous) = replaced {
            tracing::debug!(?target, event_type, "rebinding listener, previous registration replaced");
            self.detach_native(target, &previous);
        }

        let registration = Rc::new(Registration {
            key,
            listener: listener.clone(),
            namespace: options.namespace.clone(),
            native: Cell::new(NativeState::Pending),
        });
        let native = self.native_listener(selector.cloned(), listener.clone(), options);
        let listener_options = ListenerOptions {
            capture: options.capture,
            passive: options.passive,
            once: false,
        };

        if options.next_frame {
            let pending = registration.clone();
            let registry: Weak<RegistryInner> = Rc::downgrade(&self.inner);
            self.inner.document.request_animation_frame(move |_| {
                let Some(registry) = registry.upgrade() else { return };
                if pending.native.get() == NativeState::Pending {
                    let id = registry.document.add_event_listener(
                        target,
                        &pending.key.event_type,
                        native,
                        listener_options,
                    );
                    pending.native.set(NativeState::Attached(id));
                }
            });
        } else {
            let id = self.inner.document.add_event_listener(target, event_type, native, listener_options);
            registration.native.set(NativeState::Attached(id));
        }

        tracing::debug!(
            ?target,
            event_type,
            selector = registration.key.selector.as_deref(),
            namespace = registration.namespace.as_deref(),
            next_frame = options.next_frame,
            "bind"
        );
        self.inner
            .tables
            .borrow_mut()
            .entry(target)
            .or_default()
            .insert(registration);
    }

    /// Build the function actually attached to the target
    fn native_listener(&self, selector: Option<Selector>, listener: Listener, options: &BindOptions) -> NativeListener {
        let document = self.inner.document.downgrade();
        let context = options.context.clone();
        let guard = options.skip_if_detached;

        Rc::new(move |evt: &mut Event| {
            let Some(document) = document.upgrade() else { return };
            if let Some(node) = guard {
                if !document.is_connected(node) {
                    tracing::trace!(?node, event_type = evt.event_type(), "listener owner detached, skipped");
                    return;
                }
            }
            let context = match &context {
                Some(weak) => match weak.upgrade() {
                    Some(ctx) => Some(ctx),
                    None => return,
                },
                None => None,
            };

            let Some(selector) = &selector else {
                listener.call(context.as_deref(), evt);
                return;
            };
            let Some(matched) = delegate_target(&document, selector, evt) else { return };
            let previous = evt.select_target.replace(matched);
            listener.call(context.as_deref(), evt);
            evt.select_target = previous;
        })
    }

    /// Remove bindings from every target.
    ///
    /// - no `types`: everything bound on the target
    /// - `types` only: every listener of those types, all selectors
    /// - `types` + `selector`: every listener of that type and selector
    /// - `types` (+ `selector`) + `listener`: exactly that registration
    ///
    /// Asking to remove something that was never bound logs a warning.
    pub fn unbind(
        &self,
        targets: impl IntoTargets,
        types: Option<&str>,
        selector: Option<&str>,
        listener: Option<&Listener>,
    ) {
        for target in targets.into_targets() {
            let mut removed = Vec::new();
            {
                let mut tables = self.inner.tables.borrow_mut();
                let table = tables.get_mut(&target);
                match (types, table) {
                    (None, Some(table)) => removed.extend(table.take_all()),
                    (None, None) => {}
                    (Some(types), table) => {
                        let mut empty = TargetTable::default();
                        let table = table.unwrap_or(&mut empty);
                        for event_type in split_list(types) {
                            let key = BindingKey::new(event_type, selector);
                            let taken = match (listener, &key.selector) {
                                (Some(listener), _) => table.take_listener(&key, listener).into_iter().collect(),
                                (None, Some(_)) => table.take_key(&key),
                                (None, None) => table.take_type(event_type),
                            };
                            if taken.is_empty() {
                                tracing::warn!(
                                    ?target,
                                    event_type,
                                    selector = key.selector.as_deref(),
                                    "cannot unbind: nothing was bound for this type, selector and listener"
                                );
                            }
                            removed.extend(taken);
                        }
                    }
                }
                if tables.get(&target).is_some_and(TargetTable::is_empty) {
                    tables.remove(&target);
                }
            }

            for registration in &removed {
                self.detach_native(target, registration);
            }
            if !removed.is_empty() {
                tracing::debug!(?target, count = removed.len(), "unbind");
            }
        }
    }

    /// Remove every registration made under `namespace`; a no-op when there are none
    pub fn unbind_namespace(&self, targets: impl IntoTargets, namespace: &str) {
        for target in targets.into_targets() {
            let removed = {
                let mut tables = self.inner.tables.borrow_mut();
                let Some(table) = tables.get_mut(&target) else { continue };
                let removed = table.take_namespace(namespace);
                if table.is_empty() {
                    tables.remove(&target);
                }
                removed
            };
            for registration in &removed {
                self.detach_native(target, registration);
            }
            if !removed.is_empty() {
                tracing::debug!(?target, namespace, count = removed.len(), "unbind namespace");
            }
        }
    }

    /// Dispatch a bubbling, cancelable custom event on every target, with
    /// `select_target` set to the dispatch target
    pub fn trigger(&self, targets: impl IntoTargets, event_type: &str, detail: Option<Value>) {
        for target in targets.into_targets() {
            let mut evt = Event::with_init(event_type, EventInit::custom(detail.clone()));
            evt.select_target = target.as_node();
            tracing::trace!(?target, event_type, "trigger");
            self.inner.document.dispatch_event(target, evt);
        }
    }

    /// Registrations currently held for `target`
    pub fn registration_count(&self, target: impl Into<EventTarget>) -> usize {
        self.inner
            .tables
            .borrow()
            .get(&target.into())
            .map(|t| t.by_key.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Registrations held for `target` under `namespace`
    pub fn namespace_count(&self, target: impl Into<EventTarget>, namespace: &str) -> usize {
        self.inner
            .tables
            .borrow()
            .get(&target.into())
            .and_then(|t| t.by_namespace.get(namespace))
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn detach_native(&self, target: EventTarget, registration: &Registration) {
        if let NativeState::Attached(id) = registration.native.replace(NativeState::Detached) {
            self.inner.document.remove_event_listener(target, id);
        }
    }
}

/// The event target if it matches, else its nearest matching ancestor,
/// stopping before the bound target and the document. The target is already
/// retargeted into the bound target's tree; the walk follows event parents so
/// it also climbs from a shadow root to its host.
fn delegate_target(document: &Document, selector: &Selector, evt: &Event) -> Option<NodeId> {
    let target = evt.target_node()?;
    if document.matches_selector(target, selector) {
        return Some(target);
    }
    let boundary = evt.current_target().and_then(EventTarget::as_node);
    let mut current = document.event_parent(target);
    while let Some(node) = current {
        if Some(node) == boundary || node == NodeId::ROOT {
            return None;
        }
        if document.matches_selector(node, selector) {
            return Some(node);
        }
        current = document.event_parent(node);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, EventRegistry, NodeId) {
        let doc = Document::default();
        let registry = EventRegistry::new(&doc);
        let div = doc.create_element("div");
        doc.append_child(doc.body(), div).unwrap();
        (doc, registry, div)
    }

    #[test]
    fn test_indices_stay_consistent() {
        let (doc, registry, div) = setup();
        let a = Listener::new(|_| {});
        let b = Listener::new(|_| {});
        registry.bind(div, "click, keyup", None, &a, BindOptions::new().namespace("ns")).unwrap();
        registry.bind(div, "click", Some(".x"), &b, BindOptions::new().namespace("ns")).unwrap();
        assert_eq!(registry.registration_count(div), 3);
        assert_eq!(registry.namespace_count(div, "ns"), 3);
        assert_eq!(doc.listener_count(div, None), 3);

        registry.unbind(div, Some("click"), Some(".x"), Some(&b));
        assert_eq!(registry.registration_count(div), 2);
        assert_eq!(registry.namespace_count(div, "ns"), 2);

        registry.unbind_namespace(div, "ns");
        assert_eq!(registry.registration_count(div), 0);
        assert_eq!(doc.listener_count(div, None), 0);
    }

    #[test]
    fn test_rebind_replaces() {
        let (doc, registry, div) = setup();
        let a = Listener::new(|_| {});
        registry.bind(div, "click", None, &a, BindOptions::new().namespace("one")).unwrap();
        registry.bind(div, "click", None, &a, BindOptions::new().namespace("two")).unwrap();
        assert_eq!(registry.registration_count(div), 1);
        assert_eq!(registry.namespace_count(div, "one"), 0);
        assert_eq!(registry.namespace_count(div, "two"), 1);
        assert_eq!(doc.listener_count(div, Some("click")), 1);
    }

    #[test]
    fn test_bind_errors() {
        let (_doc, registry, div) = setup();
        let plain = Listener::new(|_| {});
        assert!(matches!(
            registry.bind(div, "click", Some("a[href"), &plain, BindOptions::new()),
            Err(EventError::InvalidSelector { .. })
        ));

        let method = Listener::method(|_: &String, _| {});
        assert_eq!(
            registry.bind(div, "click", None, &method, BindOptions::new()),
            Err(EventError::MissingContext { event_type: "click".into() })
        );
        assert_eq!(registry.registration_count(div), 0);
    }

    #[test]
    fn test_absent_target_is_noop() {
        let (_doc, registry, _div) = setup();
        let listener = Listener::new(|_| {});
        assert!(registry.bind(None::<NodeId>, "click", Some("::bad"), &listener, BindOptions::new()).is_ok());
        registry.unbind(None::<NodeId>, None, None, None);
    }
}
