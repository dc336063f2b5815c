//! Bind targets
//!
//! `bind`, `unbind` and `trigger` take one target, an optional target (None
//! is a silent no-op) or a list of targets.

use fos_dom::{EventTarget, NodeId};

/// Anything that names zero or more event targets
pub trait IntoTargets {
    fn into_targets(self) -> Vec<EventTarget>;
}

impl IntoTargets for EventTarget {
    fn into_targets(self) -> Vec<EventTarget> {
        vec![self]
    }
}

impl IntoTargets for NodeId {
    fn into_targets(self) -> Vec<EventTarget> {
        vec![EventTarget::Node(self)]
    }
}

impl<T: IntoTargets> IntoTargets for Option<T> {
    fn into_targets(self) -> Vec<EventTarget> {
        self.map(IntoTargets::into_targets).unwrap_or_default()
    }
}

impl<T: Into<EventTarget> + Copy> IntoTargets for &[T] {
    fn into_targets(self) -> Vec<EventTarget> {
        self.iter().map(|&t| t.into()).collect()
    }
}

impl<T: Into<EventTarget>> IntoTargets for Vec<T> {
    fn into_targets(self) -> Vec<EventTarget> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<EventTarget>, const N: usize> IntoTargets for [T; N] {
    fn into_targets(self) -> Vec<EventTarget> {
        self.into_iter().map(Into::into).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_forms() {
        assert_eq!(EventTarget::Window.into_targets(), vec![EventTarget::Window]);
        assert_eq!(NodeId::ROOT.into_targets(), vec![EventTarget::DOCUMENT]);
        assert!(None::<NodeId>.into_targets().is_empty());
        assert_eq!(
            [EventTarget::Window, EventTarget::DOCUMENT].into_targets(),
            vec![EventTarget::Window, EventTarget::DOCUMENT]
        );
        let list = vec![NodeId::ROOT];
        assert_eq!(list.as_slice().into_targets().len(), 1);
    }
}
