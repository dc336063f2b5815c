//! DOM Tree (arena-based allocation)

use crate::node::NodeData;
use crate::shadow::{ShadowRoot, ShadowRootMode};
use crate::{DomError, DomResult, Node, NodeId};

/// Arena-based DOM tree. Slot 0 is always the document node.
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self { nodes: vec![Node::document()] }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(Node::text(text.to_string()))
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    /// Tree parent (does not cross shadow boundaries)
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Parent used for event propagation: the tree parent, or the host for a shadow root
    pub fn event_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        if node.parent.is_valid() {
            return Some(node.parent);
        }
        node.as_shadow_root().map(|s| s.host)
    }

    /// Root of the tree holding `id`, following tree parents only
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// `origin` as seen from `current`: the origin itself, or the outermost
    /// shadow host around it that lives in a tree `current` can see into.
    /// `None` stands for the window.
    pub fn retarget(&self, origin: NodeId, current: Option<NodeId>) -> NodeId {
        let mut target = origin;
        loop {
            let root = self.tree_root(target);
            let Some(shadow) = self.get(root).and_then(Node::as_shadow_root) else {
                return target;
            };
            if current.is_some_and(|c| self.is_inclusive_ancestor(root, c)) {
                return target;
            }
            target = shadow.host;
        }
    }

    /// Whether the node is reachable from the document, crossing shadow hosts
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == NodeId::ROOT {
                return true;
            }
            match self.event_parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// Child ids in order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut child = self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        while child.is_valid() {
            out.push(child);
            child = self.nodes[child.index()].next_sibling;
        }
        out
    }

    /// Shadow-including preorder walk starting at (and including) `id`
    pub fn inclusive_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else { continue };
            out.push(current);
            // push in reverse so the first child is visited next
            for child in self.children(current).into_iter().rev() {
                stack.push(child);
            }
            if let Some(shadow) = node.as_element().map(|e| e.shadow_root).filter(|s| s.is_valid()) {
                stack.push(shadow);
            }
        }
        out
    }

    /// Is `ancestor` an inclusive ancestor of `id` (shadow-including)?
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.event_parent(c);
        }
        false
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end when `None`)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        self.node(parent)?;
        let child_node = self.node(child)?;
        if matches!(child_node.data, NodeData::Document | NodeData::ShadowRoot(_))
            || self.get(parent).is_some_and(|p| p.is_text())
            || self.is_inclusive_ancestor(child, parent)
        {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, child: reference });
            }
            if reference == child {
                return Ok(());
            }
        }

        self.detach(child);
        self.link(parent, child, reference);
        Ok(())
    }

    /// Create an element as the last child of `parent`, which must be a
    /// container node of this tree
    pub(crate) fn append_new_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let child = self.create_element(tag);
        self.link(parent, child, None);
        child
    }

    /// Splice a detached `child` in before `reference` (or last)
    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let (prev, next) = match reference {
            Some(r) => (self.nodes[r.index()].prev_sibling, r),
            None => (self.nodes[parent.index()].last_child, NodeId::NONE),
        };

        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.node(child)?;
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Unlink a node from its parent and siblings (no-op when already detached)
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() {
            return;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Attach a shadow root to an element
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowRootMode) -> DomResult<NodeId> {
        let element = self
            .node(host)?
            .as_element()
            .ok_or(DomError::NotAnElement(host))?;
        if element.shadow_root.is_valid() {
            return Err(DomError::ShadowRootExists(host));
        }
        let root = self.push(Node::shadow_root(ShadowRoot::new(host, mode)));
        if let Some(element) = self.nodes[host.index()].as_element_mut() {
            element.shadow_root = root;
        }
        Ok(root)
    }

    /// The open shadow root of `host`, as `element.shadowRoot` exposes it
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        let root = self.get(host)?.as_element()?.shadow_root;
        self.get(root)?.as_shadow_root()?.is_open().then_some(root)
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}
