//! fOS Events - Namespace-scoped event registry
//!
//! Binds listeners to document targets, optionally delegated through a
//! selector, and keeps enough bookkeeping to remove them again by exact
//! listener, by type and selector, or in bulk by namespace.

mod listener;
mod options;
mod targets;
mod registry;
mod map;

pub use listener::Listener;
pub use options::BindOptions;
pub use targets::IntoTargets;
pub use registry::EventRegistry;
pub use map::EventMap;

pub use fos_dom::{Event, EventTarget, NodeId};

use fos_dom::SelectorError;

/// Event registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("invalid delegation selector {selector:?}")]
    InvalidSelector {
        selector: String,
        #[source]
        source: SelectorError,
    },

    #[error("method listener for {event_type:?} bound without a context")]
    MissingContext { event_type: String },

    #[error("event map key {0:?} has no event type")]
    InvalidMapKey(String),
}

/// Split a comma-separated list, trimming entries and skipping empty ones
pub(crate) fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        let parts: Vec<_> = split_list(" click, keyup ,,").collect();
        assert_eq!(parts, vec!["click", "keyup"]);
        assert_eq!(split_list("  ").count(), 0);
    }
}
