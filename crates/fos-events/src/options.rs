//! Bind options

use std::any::Any;
use std::rc::{Rc, Weak};

use fos_dom::NodeId;

/// Options for `EventRegistry::bind`
#[derive(Debug, Clone, Default)]
pub struct BindOptions {
    /// Tag for bulk removal with `unbind_namespace`
    pub namespace: Option<String>,
    /// Receiver for method listeners; a dropped context skips the call
    pub context: Option<Weak<dyn Any>>,
    /// `AddEventListenerOptions.capture`
    pub capture: bool,
    /// `AddEventListenerOptions.passive`
    pub passive: bool,
    /// Attach the native listener on the next animation frame
    pub next_frame: bool,
    /// Skip the listener while this node is disconnected
    pub skip_if_detached: Option<NodeId>,
}

impl BindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Bind `context` (held weakly) as the receiver
    pub fn context<T: Any>(mut self, context: &Rc<T>) -> Self {
        let context: Rc<dyn Any> = context.clone();
        self.context = Some(Rc::downgrade(&context));
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

    pub fn skip_if_detached(mut self, node: NodeId) -> Self {
        self.skip_if_detached = Some(node);
        self
    }
}
