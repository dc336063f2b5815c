//! Hub bindings
//!
//! Static `"hubName; topics[; labels]"` → handler tables, the shape
//! components use to declare their hub subscriptions.

use std::collections::HashSet;

use crate::{split_list, HubError, HubHandler, HubRegistry, SubscribeOptions};

/// Ordered hub binding entries
#[derive(Debug, Clone, Default)]
pub struct HubBindings {
    entries: Vec<(String, HubHandler)>,
}

/// A parsed binding key
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BindingKey<'a> {
    pub hub: &'a str,
    pub topics: &'a str,
    pub labels: Option<&'a str>,
}

pub(crate) fn parse_key(key: &str) -> Result<BindingKey<'_>, HubError> {
    let mut parts = key.split(';').map(str::trim);
    let hub = parts.next().unwrap_or_default();
    let topics = parts.next().unwrap_or_default();
    let labels = parts.next().filter(|l| !l.is_empty());
    if hub.is_empty() || split_list(topics).next().is_none() || parts.next().is_some() {
        return Err(HubError::InvalidBindingKey(key.to_string()));
    }
    Ok(BindingKey { hub, topics, labels })
}

impl HubBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `"hubName; topics[; labels]"` entry
    pub fn on(mut self, key: &str, handler: HubHandler) -> Self {
        self.entries.push((key.trim().to_string(), handler));
        self
    }

    /// Add a `"topics[; labels]"` entry for `hub`
    pub fn for_hub(self, hub: &str, topics_and_labels: &str, handler: HubHandler) -> Self {
        let key = format!("{}; {}", hub.trim(), topics_and_labels.trim());
        self.on(&key, handler)
    }

    /// Append the entries of `other`
    pub fn extend(&mut self, other: HubBindings) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the hubs these bindings touch, in first-use order
    pub fn hub_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter_map(|(key, _)| parse_key(key).ok())
            .map(|key| key.hub)
            .filter(|hub| seen.insert(*hub))
            .collect()
    }
}

impl HubRegistry {
    /// Subscribe every binding with the same options. Keys are validated
    /// before anything is subscribed.
    pub fn bind_hub_events(&self, bindings: &HubBindings, options: &SubscribeOptions) -> Result<(), HubError> {
        let parsed = bindings
            .entries
            .iter()
            .map(|(key, handler)| parse_key(key).map(|key| (key, handler)))
            .collect::<Result<Vec<_>, _>>()?;
        for (key, handler) in parsed {
            let hub = self.get_or_create(key.hub)?;
            hub.subscribe(key.topics, key.labels, handler, options.clone())?;
        }
        Ok(())
    }

    /// Unsubscribe `namespace` from every hub the bindings touch
    pub fn unbind_hub_events(&self, bindings: &HubBindings, namespace: &str) -> Result<(), HubError> {
        for name in bindings.hub_names() {
            if let Some(hub) = self.get(name) {
                hub.unsubscribe(namespace)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(
            parse_key("dataHub; Task, Project; create, update").unwrap(),
            BindingKey { hub: "dataHub", topics: "Task, Project", labels: Some("create, update") }
        );
        assert_eq!(
            parse_key(" dataHub ; Task ").unwrap(),
            BindingKey { hub: "dataHub", topics: "Task", labels: None }
        );
        assert!(parse_key("dataHub").is_err());
        assert!(parse_key("; Task").is_err());
        assert!(parse_key("a; b; c; d").is_err());
    }

    #[test]
    fn test_hub_names_dedup() {
        let handler = HubHandler::new(|_, _| {});
        let bindings = HubBindings::new()
            .on("a; t1", handler.clone())
            .for_hub("b", "t2; l", handler.clone())
            .on("a; t3", handler);
        assert_eq!(bindings.hub_names(), vec!["a", "b"]);
    }
}
