//! Document - High-level host API
//!
//! `Document` is a cheap-clone handle. No internal borrow is held while user
//! code runs (listeners, frame callbacks, custom element reactions), so any
//! of those may call back into the document.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::custom_elements::CustomElementCallbacks;
use crate::dom_events::ListenerStore;
use crate::{
    AnimationFrames, CustomElementConstructor, CustomElementError, CustomElementInstance,
    CustomElementOptions, CustomElementRegistry, DomError, DomResult, DomTree, Event, EventPhase,
    EventTarget, FrameToken, ListenerId, ListenerOptions, NativeListener, NodeId, Selector,
    SelectorError, ShadowRootMode,
};

struct DocumentInner {
    url: String,
    tree: RefCell<DomTree>,
    listeners: RefCell<ListenerStore>,
    custom_elements: RefCell<CustomElementRegistry>,
    upgraded: RefCell<HashMap<NodeId, CustomElementInstance>>,
    frames: RefCell<AnimationFrames>,
    uncaught: RefCell<Vec<String>>,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
}

/// HTML Document
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

/// Non-owning document handle for callbacks stored inside the document
#[derive(Clone)]
pub struct WeakDocument {
    inner: Weak<DocumentInner>,
}

impl WeakDocument {
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

enum Reaction {
    Connected(Rc<dyn CustomElementCallbacks>),
    Disconnected(Rc<dyn CustomElementCallbacks>),
    AttributeChanged {
        callbacks: Rc<dyn CustomElementCallbacks>,
        name: String,
        old: Option<String>,
        new: Option<String>,
    },
}

impl Document {
    /// Create a document with `<html><head></head><body></body></html>`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let root = tree.root();
        let html = tree.append_new_element(root, "html");
        let head = tree.append_new_element(html, "head");
        let body = tree.append_new_element(html, "body");

        Self {
            inner: Rc::new(DocumentInner {
                url: url.to_string(),
                tree: RefCell::new(tree),
                listeners: RefCell::new(ListenerStore::default()),
                custom_elements: RefCell::new(CustomElementRegistry::new()),
                upgraded: RefCell::new(HashMap::new()),
                frames: RefCell::new(AnimationFrames::new()),
                uncaught: RefCell::new(Vec::new()),
                html_element: html,
                head_element: head,
                body_element: body,
            }),
        }
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.inner.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.inner.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.inner.body_element
    }

    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument { inner: Rc::downgrade(&self.inner) }
    }

    /// Same underlying document?
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read access to the tree
    pub fn with_tree<R>(&self, f: impl FnOnce(&DomTree) -> R) -> R {
        f(&self.inner.tree.borrow())
    }

    //////////////////////////////////////////////////////////////////////
    // Tree

    /// Create an element, upgrading it when its tag is a defined custom element
    pub fn create_element(&self, tag: &str) -> NodeId {
        let id = self.inner.tree.borrow_mut().create_element(tag);
        self.try_upgrade(id);
        id
    }

    /// Create a text node
    pub fn create_text(&self, text: &str) -> NodeId {
        self.inner.tree.borrow_mut().create_text(text)
    }

    /// Append `child` to `parent`, delivering connect/disconnect reactions
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference`, delivering connect/disconnect reactions
    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        let was_connected = self.is_connected(child);
        let disconnects = if was_connected { self.collect_reactions(child, false) } else { Vec::new() };

        self.inner.tree.borrow_mut().insert_before(parent, child, reference)?;

        let connects = if self.is_connected(child) { self.collect_reactions(child, true) } else { Vec::new() };
        self.run_reactions(disconnects);
        self.run_reactions(connects);
        Ok(())
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let disconnects = if self.is_connected(child) { self.collect_reactions(child, false) } else { Vec::new() };
        self.inner.tree.borrow_mut().remove_child(parent, child)?;
        self.run_reactions(disconnects);
        Ok(())
    }

    /// `node.remove()`: detach from the current parent, if any
    pub fn remove(&self, node: NodeId) -> DomResult<()> {
        match self.parent(node) {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    /// Tree parent
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().parent(node)
    }

    /// Children in order
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.tree.borrow().children(node)
    }

    /// `node.isConnected`
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.inner.tree.borrow().is_connected(node)
    }

    /// Lowercased tag name of an element
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        let tree = self.inner.tree.borrow();
        tree.get(node)?.as_element().map(|e| e.tag.clone())
    }

    /// Attach a shadow root to `host`
    pub fn attach_shadow(&self, host: NodeId, mode: ShadowRootMode) -> DomResult<NodeId> {
        self.inner.tree.borrow_mut().attach_shadow(host, mode)
    }

    /// `element.shadowRoot` (open roots only)
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().shadow_root(host)
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let tree = self.inner.tree.borrow();
        tree.get(node)?
            .as_element()?
            .get_attr(&name.to_ascii_lowercase())
            .map(str::to_string)
    }

    /// Set an attribute, notifying an upgraded element when it observes `name`
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let element = tree
                .get_mut(node)
                .ok_or(DomError::NotFound(node))?
                .as_element_mut()
                .ok_or(DomError::NotAnElement(node))?;
            element.set_attr(name, value)
        };
        self.attribute_changed(node, name, old, Some(value.to_string()));
        Ok(())
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) -> DomResult<()> {
        let old = {
            let mut tree = self.inner.tree.borrow_mut();
            let element = tree
                .get_mut(node)
                .ok_or(DomError::NotFound(node))?
                .as_element_mut()
                .ok_or(DomError::NotAnElement(node))?;
            element.remove_attr(name)
        };
        if old.is_some() {
            self.attribute_changed(node, name, old, None);
        }
        Ok(())
    }

    //////////////////////////////////////////////////////////////////////
    // Query

    /// `element.matches(selector)`
    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.matches_selector(node, &selector))
    }

    /// Match against a pre-parsed selector
    pub fn matches_selector(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(&self.inner.tree.borrow(), node)
    }

    /// `element.closest(selector)`
    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(selector.closest(&self.inner.tree.borrow(), node))
    }

    /// First descendant of `root` matching `selector`
    pub fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.query_selector_all(root, selector)?.into_iter().next())
    }

    /// Every descendant of `root` matching `selector`, in tree order
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(selector.query_all(&self.inner.tree.borrow(), root))
    }

    //////////////////////////////////////////////////////////////////////
    // Events

    /// `target.addEventListener(type, listener, options)`
    pub fn add_event_listener(
        &self,
        target: impl Into<EventTarget>,
        event_type: &str,
        listener: NativeListener,
        options: ListenerOptions,
    ) -> ListenerId {
        let target = target.into();
        tracing::trace!(?target, event_type, "addEventListener");
        self.inner.listeners.borrow_mut().add(target, event_type, listener, options)
    }

    /// `target.removeEventListener(...)`; false when `id` was not attached to `target`
    pub fn remove_event_listener(&self, target: impl Into<EventTarget>, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(target.into(), id)
    }

    /// Native listeners on `target`, optionally restricted to one type
    pub fn listener_count(&self, target: impl Into<EventTarget>, event_type: Option<&str>) -> usize {
        self.inner.listeners.borrow().count(target.into(), event_type)
    }

    /// `target.dispatchEvent(event)`; returns false when the default was prevented
    pub fn dispatch_event(&self, target: impl Into<EventTarget>, mut event: Event) -> bool {
        let target = target.into();
        let path = self.event_path(target);
        let retargeted = self.retarget_path(target, &path);
        let timestamp = self.inner.frames.borrow().now();
        event.begin(target, timestamp);
        tracing::trace!(?target, event_type = event.event_type(), depth = path.len(), "dispatch");

        for (&current, &seen) in path.iter().zip(&retargeted).skip(1).rev() {
            if event.is_propagation_stopped() {
                break;
            }
            event.enter(current, seen, EventPhase::Capturing);
            self.invoke_listeners(current, &mut event, Some(true));
        }

        if !event.is_propagation_stopped() {
            event.enter(target, target, EventPhase::AtTarget);
            self.invoke_listeners(target, &mut event, Some(true));
            if !event.is_immediate_stopped() {
                self.invoke_listeners(target, &mut event, Some(false));
            }
        }

        if event.bubbles {
            for (&current, &seen) in path.iter().zip(&retargeted).skip(1) {
                if event.is_propagation_stopped() {
                    break;
                }
                event.enter(current, seen, EventPhase::Bubbling);
                self.invoke_listeners(current, &mut event, Some(false));
            }
        }

        event.finish();
        !event.is_default_prevented()
    }

    /// Event parent, crossing from a shadow root to its host
    pub fn event_parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().event_parent(node)
    }

    /// The target each entry of `path` sees
    fn retarget_path(&self, target: EventTarget, path: &[EventTarget]) -> Vec<EventTarget> {
        let EventTarget::Node(origin) = target else {
            return path.to_vec();
        };
        let tree = self.inner.tree.borrow();
        path.iter()
            .map(|current| EventTarget::Node(tree.retarget(origin, current.as_node())))
            .collect()
    }

    /// Target first, then event parents up to the document, then the window
    fn event_path(&self, target: EventTarget) -> Vec<EventTarget> {
        let EventTarget::Node(node) = target else {
            return vec![EventTarget::Window];
        };
        let tree = self.inner.tree.borrow();
        let mut path = vec![target];
        let mut current = node;
        while let Some(parent) = tree.event_parent(current) {
            path.push(EventTarget::Node(parent));
            current = parent;
        }
        if current == NodeId::ROOT {
            path.push(EventTarget::Window);
        }
        path
    }

    fn invoke_listeners(&self, target: EventTarget, event: &mut Event, capture: Option<bool>) {
        let entries = self.inner.listeners.borrow().snapshot(target, event.event_type(), capture);
        for entry in entries {
            if entry.removed.get() {
                continue;
            }
            if entry.options.once {
                self.inner.listeners.borrow_mut().remove(target, entry.id);
            }
            event.set_passive(entry.options.passive);
            let callback = entry.callback.clone();
            self.report_uncaught("event listener", || callback(event));
            event.set_passive(false);
            if event.is_immediate_stopped() {
                break;
            }
        }
    }

    //////////////////////////////////////////////////////////////////////
    // Animation frames

    /// `requestAnimationFrame(callback)`
    pub fn request_animation_frame(&self, callback: impl FnOnce(f64) + 'static) -> FrameToken {
        self.inner.frames.borrow_mut().request(Box::new(callback))
    }

    /// `cancelAnimationFrame(token)`
    pub fn cancel_animation_frame(&self, token: FrameToken) -> bool {
        self.inner.frames.borrow_mut().cancel(token)
    }

    /// Run one frame: every callback requested before this call fires, in
    /// request order. Returns how many ran.
    pub fn run_animation_frame(&self) -> usize {
        let (timestamp, due) = self.inner.frames.borrow_mut().begin_frame();
        let count = due.len();
        tracing::trace!(timestamp, count, "animation frame");
        for callback in due {
            self.report_uncaught("animation frame callback", || callback(timestamp));
        }
        count
    }

    /// Run `n` frames
    pub fn run_animation_frames(&self, n: usize) {
        for _ in 0..n {
            self.run_animation_frame();
        }
    }

    /// Callbacks waiting for the next frame
    pub fn pending_animation_frames(&self) -> usize {
        self.inner.frames.borrow().pending()
    }

    //////////////////////////////////////////////////////////////////////
    // Custom elements

    /// `customElements.define(name, constructor, options)`; upgrades existing elements
    pub fn define(
        &self,
        name: &str,
        constructor: CustomElementConstructor,
        options: CustomElementOptions,
    ) -> Result<(), CustomElementError> {
        self.inner.custom_elements.borrow_mut().define(name, constructor, options)?;
        tracing::debug!(name, "custom element defined");

        let candidates: Vec<NodeId> = {
            let tree = self.inner.tree.borrow();
            let upgraded = self.inner.upgraded.borrow();
            (0..tree.len() as u32)
                .map(NodeId)
                .filter(|id| !upgraded.contains_key(id))
                .filter(|id| tree.get(*id).and_then(|n| n.as_element()).is_some_and(|e| e.tag == name))
                .collect()
        };
        for id in candidates {
            if self.try_upgrade(id) && self.is_connected(id) {
                let reactions = self.collect_reactions(id, true).into_iter().take(1).collect();
                self.run_reactions(reactions);
            }
        }
        Ok(())
    }

    /// Is `name` a defined custom element?
    pub fn is_defined(&self, name: &str) -> bool {
        self.inner.custom_elements.borrow().is_defined(name)
    }

    /// The upgraded instance behind `node`, downcast to `T`
    pub fn custom_element<T: Any>(&self, node: NodeId) -> Option<Rc<T>> {
        let instance = self.inner.upgraded.borrow().get(&node)?.instance.clone();
        instance.downcast::<T>().ok()
    }

    fn try_upgrade(&self, node: NodeId) -> bool {
        let Some(tag) = self.tag_name(node) else { return false };
        let constructor = match self.inner.custom_elements.borrow().get(&tag) {
            Some(definition) => definition.constructor.clone(),
            None => return false,
        };
        let mut instance = None;
        self.report_uncaught("custom element constructor", || instance = constructor(self, node));
        match instance {
            Some(instance) => {
                self.inner.upgraded.borrow_mut().insert(node, instance);
                tracing::debug!(?node, tag, "custom element upgraded");
                true
            }
            None => false,
        }
    }

    fn collect_reactions(&self, root: NodeId, connected: bool) -> Vec<Reaction> {
        let nodes = self.inner.tree.borrow().inclusive_descendants(root);
        let upgraded = self.inner.upgraded.borrow();
        nodes
            .into_iter()
            .filter_map(|id| upgraded.get(&id))
            .map(|instance| {
                let callbacks = instance.callbacks.clone();
                if connected { Reaction::Connected(callbacks) } else { Reaction::Disconnected(callbacks) }
            })
            .collect()
    }

    fn attribute_changed(&self, node: NodeId, name: &str, old: Option<String>, new: Option<String>) {
        let name = name.to_ascii_lowercase();
        let Some(callbacks) = self.inner.upgraded.borrow().get(&node).map(|i| i.callbacks.clone()) else {
            return;
        };
        let observed = self.tag_name(node).is_some_and(|tag| {
            self.inner
                .custom_elements
                .borrow()
                .get(&tag)
                .is_some_and(|d| d.observed_attributes.contains(&name))
        });
        if observed {
            self.run_reactions(vec![Reaction::AttributeChanged { callbacks, name, old, new }]);
        }
    }

    fn run_reactions(&self, reactions: Vec<Reaction>) {
        for reaction in reactions {
            self.report_uncaught("custom element reaction", || match reaction {
                Reaction::Connected(cb) => cb.connected(),
                Reaction::Disconnected(cb) => cb.disconnected(),
                Reaction::AttributeChanged { callbacks, name, old, new } => {
                    callbacks.attribute_changed(&name, old.as_deref(), new.as_deref())
                }
            });
        }
    }

    //////////////////////////////////////////////////////////////////////
    // Error reporting

    /// Run a user callback; a panic is reported (logged and recorded) instead
    /// of unwinding into the host operation that invoked it.
    fn report_uncaught(&self, origin: &str, f: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            let message = panic_message(payload.as_ref());
            tracing::error!(origin, %message, "uncaught error");
            self.inner.uncaught.borrow_mut().push(message);
        }
    }

    /// Drain the uncaught errors reported so far
    pub fn take_uncaught_errors(&self) -> Vec<String> {
        std::mem::take(&mut *self.inner.uncaught.borrow_mut())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
