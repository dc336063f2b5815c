//! Custom Elements
//!
//! Custom element registry and lifecycle callbacks.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::{Document, NodeId};

/// Reactions the host delivers to an upgraded element
pub trait CustomElementCallbacks {
    /// The element became connected to the document
    fn connected(&self);

    /// The element left the document
    fn disconnected(&self);

    /// An observed attribute changed
    fn attribute_changed(&self, _name: &str, _old: Option<&str>, _new: Option<&str>) {}
}

/// An upgraded element's instance: the reactions plus a downcastable handle
#[derive(Clone)]
pub struct CustomElementInstance {
    pub(crate) callbacks: Rc<dyn CustomElementCallbacks>,
    pub(crate) instance: Rc<dyn Any>,
}

impl CustomElementInstance {
    /// Wrap a reactions object; `instance` is what `Document::custom_element` hands back
    pub fn new<R, T>(callbacks: Rc<R>, instance: Rc<T>) -> Self
    where
        R: CustomElementCallbacks + 'static,
        T: Any,
    {
        Self { callbacks, instance }
    }
}

/// Builds the instance for a freshly created (or upgraded) element
pub type CustomElementConstructor = Rc<dyn Fn(&Document, NodeId) -> Option<CustomElementInstance>>;

/// Custom elements registry
#[derive(Default)]
pub struct CustomElementRegistry {
    definitions: HashMap<String, CustomElementDefinition>,
}

/// Custom element definition
#[derive(Clone)]
pub struct CustomElementDefinition {
    pub name: String,
    pub constructor: CustomElementConstructor,
    pub observed_attributes: Vec<String>,
}

impl CustomElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a custom element
    pub fn define(
        &mut self,
        name: &str,
        constructor: CustomElementConstructor,
        options: CustomElementOptions,
    ) -> Result<(), CustomElementError> {
        if !Self::is_valid_name(name) {
            return Err(CustomElementError::InvalidName(name.to_string()));
        }
        if self.definitions.contains_key(name) {
            return Err(CustomElementError::AlreadyDefined(name.to_string()));
        }

        let definition = CustomElementDefinition {
            name: name.to_string(),
            constructor,
            observed_attributes: options
                .observed_attributes
                .iter()
                .map(|a| a.to_ascii_lowercase())
                .collect(),
        };
        self.definitions.insert(name.to_string(), definition);
        Ok(())
    }

    /// Get element definition
    pub fn get(&self, name: &str) -> Option<&CustomElementDefinition> {
        self.definitions.get(name)
    }

    /// Check if element is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Validate custom element name
    pub fn is_valid_name(name: &str) -> bool {
        // Must contain hyphen
        if !name.contains('-') {
            return false;
        }

        // Must start with lowercase letter
        if !name.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
            return false;
        }

        if name.chars().any(|c| c.is_ascii_uppercase()) {
            return false;
        }

        let reserved = [
            "annotation-xml", "color-profile", "font-face", "font-face-src",
            "font-face-uri", "font-face-format", "font-face-name", "missing-glyph",
        ];
        !reserved.contains(&name)
    }
}

/// Custom element options
#[derive(Debug, Clone, Default)]
pub struct CustomElementOptions {
    pub observed_attributes: Vec<String>,
}

/// Custom element errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomElementError {
    #[error("invalid custom element name: {0:?}")]
    InvalidName(String),

    #[error("custom element {0:?} is already defined")]
    AlreadyDefined(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_ctor() -> CustomElementConstructor {
        Rc::new(|_, _| None)
    }

    #[test]
    fn test_valid_names() {
        assert!(CustomElementRegistry::is_valid_name("my-element"));
        assert!(CustomElementRegistry::is_valid_name("app-header"));
        assert!(!CustomElementRegistry::is_valid_name("myelement")); // no hyphen
        assert!(!CustomElementRegistry::is_valid_name("My-Element")); // uppercase
        assert!(!CustomElementRegistry::is_valid_name("font-face")); // reserved
    }

    #[test]
    fn test_define() {
        let mut registry = CustomElementRegistry::new();

        assert!(registry.define("my-element", noop_ctor(), CustomElementOptions::default()).is_ok());
        assert!(registry.is_defined("my-element"));

        // Duplicate
        assert_eq!(
            registry.define("my-element", noop_ctor(), CustomElementOptions::default()),
            Err(CustomElementError::AlreadyDefined("my-element".into()))
        );
    }

    #[test]
    fn test_observed_attributes_are_lowercased() {
        let mut registry = CustomElementRegistry::new();
        let options = CustomElementOptions { observed_attributes: vec!["Label".into()] };
        registry.define("x-label", noop_ctor(), options).unwrap();
        assert_eq!(registry.get("x-label").unwrap().observed_attributes, vec!["label"]);
    }
}
