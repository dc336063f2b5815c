//! Event maps
//!
//! Static `"type[, type][; selector]"` → listener tables, the shape
//! components use to declare their element, document and window events.

use crate::{BindOptions, EventError, EventRegistry, IntoTargets, Listener};

/// Ordered `"types; selector"` → listener entries
#[derive(Debug, Clone, Default)]
pub struct EventMap {
    entries: Vec<(String, Listener)>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert`
    pub fn on(mut self, type_and_selector: &str, listener: Listener) -> Self {
        self.insert(type_and_selector, listener);
        self
    }

    /// Add an entry; an existing entry with the same key is replaced
    pub fn insert(&mut self, type_and_selector: &str, listener: Listener) {
        let key = type_and_selector.trim().to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = listener,
            None => self.entries.push((key, listener)),
        }
    }

    /// Merge `other` into this map, `other` winning on equal keys
    pub fn extend(&mut self, other: EventMap) {
        for (key, listener) in other.entries {
            self.insert(&key, listener);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Listener)> {
        self.entries.iter().map(|(k, l)| (k.as_str(), l))
    }
}

/// Split `"click, keyup; .button"` into `("click, keyup", Some(".button"))`
pub(crate) fn parse_key(type_and_selector: &str) -> Result<(&str, Option<&str>), EventError> {
    let (types, selector) = match type_and_selector.split_once(';') {
        Some((types, selector)) => (types.trim(), Some(selector.trim()).filter(|s| !s.is_empty())),
        None => (type_and_selector.trim(), None),
    };
    if crate::split_list(types).next().is_none() {
        return Err(EventError::InvalidMapKey(type_and_selector.to_string()));
    }
    Ok((types, selector))
}

impl EventRegistry {
    /// Bind every entry of `map` on the targets with the same options
    pub fn bind_map(&self, targets: impl IntoTargets, map: &EventMap, options: &BindOptions) -> Result<(), EventError> {
        let targets = targets.into_targets();
        for (key, listener) in map.iter() {
            let (types, selector) = parse_key(key)?;
            self.bind(targets.as_slice(), types, selector, listener, options.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("click").unwrap(), ("click", None));
        assert_eq!(parse_key(" click, keyup ; .btn > a ").unwrap(), ("click, keyup", Some(".btn > a")));
        assert_eq!(parse_key("click;").unwrap(), ("click", None));
        assert_eq!(parse_key(" ; .btn"), Err(EventError::InvalidMapKey(" ; .btn".into())));
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let a = Listener::new(|_| {});
        let b = Listener::new(|_| {});
        let mut map = EventMap::new().on("click; .a", a).on("keyup", b.clone());
        map.extend(EventMap::new().on("click; .a", b.clone()));
        assert_eq!(map.len(), 2);
        assert!(map.iter().all(|(_, l)| l.ptr_eq(&b)));
    }
}
