//! Hub registry

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::{Hub, HubError};

/// Hubs by name. Clones share the same table.
#[derive(Clone, Default)]
pub struct HubRegistry {
    hubs: Rc<RefCell<HashMap<String, Hub>>>,
}

impl HubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hub called `name`, created on first use
    pub fn get_or_create(&self, name: &str) -> Result<Hub, HubError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(HubError::MissingName);
        }
        let mut hubs = self.hubs.borrow_mut();
        let hub = hubs.entry(name.to_string()).or_insert_with(|| {
            tracing::debug!(hub = name, "hub created");
            Hub::new(name)
        });
        Ok(hub.clone())
    }

    pub fn get(&self, name: &str) -> Option<Hub> {
        self.hubs.borrow().get(name.trim()).cloned()
    }

    /// Forget a hub; existing handles keep working but are no longer reachable by name
    pub fn remove(&self, name: &str) -> Option<Hub> {
        let removed = self.hubs.borrow_mut().remove(name.trim());
        if removed.is_some() {
            tracing::debug!(hub = name, "hub removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.hubs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.borrow().is_empty()
    }
}
