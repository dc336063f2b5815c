//! fOS Hub - Publish/subscribe buses
//!
//! Named, isolated message hubs. Subscribers address a topic alone or a
//! topic plus label; publishing notifies label-matched subscribers first,
//! then topic-only subscribers. No DOM dependency.

mod handler;
mod hub;
mod registry;
mod bindings;

pub use handler::{HubEventInfo, HubHandler};
pub use hub::{Hub, SubscribeOptions};
pub use registry::HubRegistry;
pub use bindings::HubBindings;

pub use serde_json::Value;

thread_local! {
    static DEFAULT_REGISTRY: HubRegistry = HubRegistry::new();
}

/// The thread's default hub registry
pub fn default_registry() -> HubRegistry {
    DEFAULT_REGISTRY.with(HubRegistry::clone)
}

/// Get or create a hub in the default registry
pub fn hub(name: &str) -> Result<Hub, HubError> {
    DEFAULT_REGISTRY.with(|registry| registry.get_or_create(name))
}

/// Delete a hub from the default registry
pub fn remove_hub(name: &str) -> Option<Hub> {
    DEFAULT_REGISTRY.with(|registry| registry.remove(name))
}

/// Hub errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error("a hub needs a name")]
    MissingName,

    #[error("unsubscribe needs a namespace")]
    MissingNamespace,

    #[error("method handler for topic {topic:?} subscribed without a context")]
    MissingContext { topic: String },

    #[error("hub binding key {0:?} must look like \"hubName; topics[; labels]\"")]
    InvalidBindingKey(String),
}

/// Split a comma-separated list, trimming entries and skipping empty ones
pub(crate) fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}
