//! Shadow DOM
//!
//! Shadow roots are ordinary arena nodes with no tree parent; their event
//! parent is the host element.

use crate::NodeId;

/// Shadow root mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowRootMode {
    #[default]
    Open,
    Closed,
}

/// Shadow root
#[derive(Debug, Clone)]
pub struct ShadowRoot {
    pub host: NodeId,
    pub mode: ShadowRootMode,
}

impl ShadowRoot {
    /// Create a new shadow root
    pub fn new(host: NodeId, mode: ShadowRootMode) -> Self {
        Self { host, mode }
    }

    /// Whether `element.shadowRoot` exposes this root
    pub fn is_open(&self) -> bool {
        self.mode == ShadowRootMode::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_root_mode() {
        let open = ShadowRoot::new(NodeId(1), ShadowRootMode::default());
        let closed = ShadowRoot::new(NodeId(1), ShadowRootMode::Closed);

        assert!(open.is_open());
        assert!(!closed.is_open());
    }
}
