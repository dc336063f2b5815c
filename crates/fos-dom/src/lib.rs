//! fOS DOM - Host document model
//!
//! Arena-based document used as the host platform for fOS components:
//! tree mutation with connect/disconnect reactions, shadow roots, selector
//! matching, native listener dispatch and animation frames.

mod node;
mod tree;
mod document;
mod element;
mod shadow;
mod dom_events;
mod custom_elements;
mod frames;
mod operations;

pub use node::{Node, NodeData, ElementData};
pub use tree::DomTree;
pub use document::{Document, WeakDocument};
pub use element::{Selector, SelectorError};
pub use shadow::{ShadowRoot, ShadowRootMode};
pub use dom_events::{Event, EventInit, EventPhase, ListenerId, ListenerOptions, NativeListener};
pub use custom_elements::{
    CustomElementCallbacks, CustomElementConstructor, CustomElementError, CustomElementInstance,
    CustomElementOptions, CustomElementRegistry,
};
pub use frames::{AnimationFrames, FrameToken, FRAME_INTERVAL_MS};
pub use operations::{DomError, DomResult};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check that this is not the `NONE` sentinel
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Anything listeners can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// A tree node (element, shadow root, text or the document itself)
    Node(NodeId),
    /// The global window
    Window,
}

impl EventTarget {
    /// The document node as a target
    pub const DOCUMENT: EventTarget = EventTarget::Node(NodeId::ROOT);

    /// The node behind this target, if any
    pub fn as_node(self) -> Option<NodeId> {
        match self {
            EventTarget::Node(id) => Some(id),
            EventTarget::Window => None,
        }
    }
}

impl From<NodeId> for EventTarget {
    fn from(id: NodeId) -> Self {
        EventTarget::Node(id)
    }
}
