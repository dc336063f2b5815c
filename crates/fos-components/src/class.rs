//! Class definitions
//!
//! A `ClassDef` is one class of a component's inheritance chain: its own
//! event and hub declarations keyed by method name, its display hooks and
//! its observed attributes, plus a link to the parent class. Base classes
//! are written as functions generic over the leaf type, so every class in a
//! chain shares the leaf's `C`.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use fos_dom::Event;
use fos_events::{BindOptions, Listener};
use fos_hub::{HubEventInfo, HubHandler, Value};

pub(crate) type EventMethod<C> = Rc<dyn Fn(&C, &mut Event)>;
pub(crate) type HubMethod<C> = Rc<dyn Fn(&C, &Value, &HubEventInfo)>;
pub(crate) type DisplayHook<C> = Rc<dyn Fn(&C, bool)>;

/// Where a declared event listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventScope {
    /// The component itself (or its open shadow root)
    Element,
    Document,
    Window,
}

/// Where and how a declared method listens: scope, types, optional delegation selector and listener flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct On {
    pub scope: EventScope,
    /// Comma-separated event types
    pub types: String,
    pub selector: Option<String>,
    pub capture: bool,
    pub passive: bool,
    pub next_frame: bool,
}

impl On {
    fn new(scope: EventScope, types: &str) -> Self {
        Self {
            scope,
            types: types.trim().to_string(),
            selector: None,
            capture: false,
            passive: false,
            next_frame: false,
        }
    }

    /// Listen on the component element
    pub fn element(types: &str) -> Self {
        Self::new(EventScope::Element, types)
    }

    /// Listen on the document
    pub fn document(types: &str) -> Self {
        Self::new(EventScope::Document, types)
    }

    /// Listen on the window
    pub fn window(types: &str) -> Self {
        Self::new(EventScope::Window, types)
    }

    /// Delegate through `selector`
    pub fn selector(mut self, selector: &str) -> Self {
        self.selector = Some(selector.trim().to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }

    pub fn next_frame(mut self) -> Self {
        self.next_frame = true;
        self
    }

    /// Layer these listener flags over `base`
    pub(crate) fn bind_options(&self, mut base: BindOptions) -> BindOptions {
        base.capture = self.capture;
        base.passive = self.passive;
        base.next_frame = self.next_frame;
        base
    }
}

/// One event declaration
pub struct EventDecl<C> {
    pub(crate) class: String,
    pub(crate) method: String,
    pub(crate) on: On,
    pub(crate) handler: EventMethod<C>,
}

impl<C: Any> EventDecl<C> {
    /// The declared method name
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn on(&self) -> &On {
        &self.on
    }

    /// Name of the class that declared it
    pub fn declared_by(&self) -> &str {
        &self.class
    }

    /// A method listener calling the declared handler on the bound component
    pub(crate) fn listener(&self) -> Listener {
        let handler = self.handler.clone();
        Listener::method(move |component: &C, evt: &mut Event| handler(component, evt))
    }
}

impl<C> Clone for EventDecl<C> {
    fn clone(&self) -> Self {
        Self {
            class: self.class.clone(),
            method: self.method.clone(),
            on: self.on.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<C> fmt::Debug for EventDecl<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDecl")
            .field("class", &self.class)
            .field("method", &self.method)
            .field("on", &self.on)
            .finish_non_exhaustive()
    }
}

/// One hub declaration
pub struct HubDecl<C> {
    pub(crate) class: String,
    pub(crate) method: String,
    pub(crate) hub: String,
    pub(crate) topics: String,
    pub(crate) labels: Option<String>,
    pub(crate) handler: HubMethod<C>,
}

impl<C: Any> HubDecl<C> {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    pub fn topics(&self) -> &str {
        &self.topics
    }

    pub fn labels(&self) -> Option<&str> {
        self.labels.as_deref()
    }

    pub fn declared_by(&self) -> &str {
        &self.class
    }

    pub(crate) fn handler(&self) -> HubHandler {
        let handler = self.handler.clone();
        HubHandler::method(move |component: &C, payload: &Value, info: &HubEventInfo| handler(component, payload, info))
    }
}

impl<C> Clone for HubDecl<C> {
    fn clone(&self) -> Self {
        Self {
            class: self.class.clone(),
            method: self.method.clone(),
            hub: self.hub.clone(),
            topics: self.topics.clone(),
            labels: self.labels.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<C> fmt::Debug for HubDecl<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubDecl")
            .field("class", &self.class)
            .field("method", &self.method)
            .field("hub", &self.hub)
            .field("topics", &self.topics)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

/// One class in a component's inheritance chain
pub struct ClassDef<C> {
    name: String,
    parent: Option<Box<ClassDef<C>>>,
    pub(crate) events: Vec<EventDecl<C>>,
    pub(crate) hubs: Vec<HubDecl<C>>,
    pub(crate) pre_display: Option<DisplayHook<C>>,
    pub(crate) post_display: Option<DisplayHook<C>>,
    pub(crate) observed_attributes: Vec<String>,
}

impl<C: Any> ClassDef<C> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            events: Vec::new(),
            hubs: Vec::new(),
            pre_display: None,
            post_display: None,
            observed_attributes: Vec::new(),
        }
    }

    /// Set the parent class
    pub fn extends(mut self, parent: ClassDef<C>) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Declare `method` as a listener for `on`. Redeclaring a method name in
    /// the same class replaces the earlier declaration.
    pub fn on_event(mut self, method: &str, on: On, handler: impl Fn(&C, &mut Event) + 'static) -> Self {
        let decl = EventDecl {
            class: self.name.clone(),
            method: method.to_string(),
            on,
            handler: Rc::new(handler),
        };
        match self.events.iter_mut().find(|d| d.method == method) {
            Some(existing) => *existing = decl,
            None => self.events.push(decl),
        }
        self
    }

    /// Declare `method` as a subscriber of `topics` (and `labels`) on `hub`
    pub fn on_hub(
        mut self,
        method: &str,
        hub: &str,
        topics: &str,
        labels: Option<&str>,
        handler: impl Fn(&C, &Value, &HubEventInfo) + 'static,
    ) -> Self {
        let decl = HubDecl {
            class: self.name.clone(),
            method: method.to_string(),
            hub: hub.trim().to_string(),
            topics: topics.trim().to_string(),
            labels: labels.map(str::trim).filter(|l| !l.is_empty()).map(str::to_string),
            handler: Rc::new(handler),
        };
        match self.hubs.iter_mut().find(|d| d.method == method) {
            Some(existing) => *existing = decl,
            None => self.hubs.push(decl),
        }
        self
    }

    /// Hook run on the first animation frame after each attach (`true` on the first attach)
    pub fn pre_display(mut self, hook: impl Fn(&C, bool) + 'static) -> Self {
        self.pre_display = Some(Rc::new(hook));
        self
    }

    /// Hook run two animation frames after each attach (`true` on the first attach)
    pub fn post_display(mut self, hook: impl Fn(&C, bool) + 'static) -> Self {
        self.post_display = Some(Rc::new(hook));
        self
    }

    /// Attributes whose changes reach `Component::attribute_changed`
    pub fn observed_attributes(mut self, attributes: &[&str]) -> Self {
        self.observed_attributes
            .extend(attributes.iter().map(|a| a.trim().to_ascii_lowercase()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&ClassDef<C>> {
        self.parent.as_deref()
    }

    /// This class followed by its ancestors, leaf to root
    pub fn chain(&self) -> impl Iterator<Item = &ClassDef<C>> {
        std::iter::successors(Some(self), |class| class.parent())
    }
}

impl<C> fmt::Debug for ClassDef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("events", &self.events)
            .field("hubs", &self.hubs)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}
