//! Component trait and per-instance host state

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use fos_dom::{Document, EventTarget, NodeId};
use fos_events::{BindOptions, EventMap, EventRegistry};
use fos_hub::{HubBindings, HubRegistry, SubscribeOptions};

use crate::class::ClassDef;
use crate::runtime::Runtime;

static COMPONENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A custom element implementation.
///
/// `class` describes the declarative bindings; the optional maps returned by
/// `events`, `doc_events`, `win_events` and `hub_events` are bound next to
/// them with the instance as context. All bindings live in the instance's
/// uid namespace.
pub trait Component: Any + Sized {
    /// The leaf class of this component's chain
    fn class() -> ClassDef<Self>;

    /// Build the instance for a freshly upgraded element
    fn create(host: ComponentHost) -> Self;

    fn host(&self) -> &ComponentHost;

    /// Runs once, on the first attach that completes it
    fn init(&self) {}

    /// An observed attribute changed
    fn attribute_changed(&self, _name: &str, _old: Option<&str>, _new: Option<&str>) {}

    /// Listeners bound on the element itself
    fn events(&self) -> Option<EventMap> {
        None
    }

    /// Listeners bound on the document
    fn doc_events(&self) -> Option<EventMap> {
        None
    }

    /// Listeners bound on the window
    fn win_events(&self) -> Option<EventMap> {
        None
    }

    /// Hub subscriptions, keyed `"hubName; topics[; labels]"`
    fn hub_events(&self) -> Option<HubBindings> {
        None
    }
}

/// Lifecycle flags of one instance
#[derive(Default)]
pub(crate) struct LifecycleState {
    pub(crate) connect_count: Cell<u32>,
    pub(crate) initialized: Cell<bool>,
    pub(crate) init_running: Cell<bool>,
    pub(crate) element_bound: Cell<bool>,
    pub(crate) hub_active: Cell<bool>,
    pub(crate) parent_active: Cell<bool>,
    pub(crate) detach_check_scheduled: Cell<bool>,
    pub(crate) pre_display_scheduled: Cell<bool>,
    pub(crate) post_display_scheduled: Cell<bool>,
    pub(crate) hub_names: RefCell<Vec<String>>,
}

/// What the runtime hands each instance: its element, its uid and access to
/// the shared registries
pub struct ComponentHost {
    runtime: Runtime,
    node: NodeId,
    uid: String,
    pub(crate) state: LifecycleState,
}

impl ComponentHost {
    pub(crate) fn new(runtime: Runtime, node: NodeId) -> Self {
        let seq = COMPONENT_SEQ.fetch_add(1, Ordering::SeqCst);
        let uid = format!("{}{}", runtime.config().uid_prefix, seq);
        Self {
            runtime,
            node,
            uid,
            state: LifecycleState::default(),
        }
    }

    /// The host element
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Unique id, also the namespace of every binding this instance makes
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn document(&self) -> &Document {
        self.runtime.document()
    }

    pub fn events(&self) -> &EventRegistry {
        self.runtime.events()
    }

    pub fn hubs(&self) -> &HubRegistry {
        self.runtime.hubs()
    }

    pub fn is_connected(&self) -> bool {
        self.document().is_connected(self.node)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized.get()
    }

    /// Times the element has been attached
    pub fn connect_count(&self) -> u32 {
        self.state.connect_count.get()
    }

    pub fn parent_bindings_active(&self) -> bool {
        self.state.parent_active.get()
    }

    pub fn hub_bindings_active(&self) -> bool {
        self.state.hub_active.get()
    }

    /// Where element-scoped declarations are bound: the open shadow root when
    /// the element has one, otherwise the element
    pub fn event_root(&self) -> EventTarget {
        let shadow = self
            .runtime
            .config()
            .shadow_root_delegation
            .then(|| self.document().shadow_root(self.node))
            .flatten();
        EventTarget::Node(shadow.unwrap_or(self.node))
    }

    /// Options binding in this instance's namespace with `component` as context
    pub fn bind_options<C: Any>(&self, component: &Rc<C>) -> BindOptions {
        BindOptions::new().namespace(self.uid.as_str()).context(component)
    }

    pub fn subscribe_options<C: Any>(&self, component: &Rc<C>) -> SubscribeOptions {
        SubscribeOptions::new().namespace(self.uid.as_str()).context(component)
    }
}

impl fmt::Debug for ComponentHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHost")
            .field("node", &self.node)
            .field("uid", &self.uid)
            .field("connect_count", &self.state.connect_count.get())
            .field("initialized", &self.state.initialized.get())
            .finish_non_exhaustive()
    }
}
