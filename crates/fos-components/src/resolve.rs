//! Class chain resolution
//!
//! Walks a class chain leaf to root. The first class that declares a method
//! name owns it, so a subclass redeclaring an inherited method replaces the
//! parent's binding instead of adding a second one. Event and hub
//! declarations use separate name sets.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use fos_dom::Selector;
use fos_hub::HubError;

use crate::class::{ClassDef, DisplayHook, EventDecl, EventScope, HubDecl};
use crate::error::ComponentError;

/// Merged declarations of a whole class chain, grouped by scope.
///
/// A group is `None` when no class in the chain declares anything for it.
pub struct ResolvedClass<C> {
    name: String,
    chain: Vec<String>,
    element: Option<Vec<EventDecl<C>>>,
    document: Option<Vec<EventDecl<C>>>,
    window: Option<Vec<EventDecl<C>>>,
    hub: Option<Vec<HubDecl<C>>>,
    pub(crate) pre_display: Option<DisplayHook<C>>,
    pub(crate) post_display: Option<DisplayHook<C>>,
    observed_attributes: Vec<String>,
}

impl<C: Any> ResolvedClass<C> {
    pub fn resolve(class: &ClassDef<C>) -> Self {
        let mut event_names = HashSet::new();
        let mut hub_names = HashSet::new();
        let mut element = Vec::new();
        let mut document = Vec::new();
        let mut window = Vec::new();
        let mut hub = Vec::new();
        let mut pre_display = None;
        let mut post_display = None;
        let mut observed_attributes: Vec<String> = Vec::new();

        for def in class.chain() {
            for decl in &def.events {
                if !event_names.insert(decl.method.as_str()) {
                    tracing::trace!(class = def.name(), method = %decl.method, "event declaration overridden");
                    continue;
                }
                match decl.on.scope {
                    EventScope::Element => element.push(decl.clone()),
                    EventScope::Document => document.push(decl.clone()),
                    EventScope::Window => window.push(decl.clone()),
                }
            }
            for decl in &def.hubs {
                if hub_names.insert(decl.method.as_str()) {
                    hub.push(decl.clone());
                }
            }
            if pre_display.is_none() {
                pre_display = def.pre_display.clone();
            }
            if post_display.is_none() {
                post_display = def.post_display.clone();
            }
            for attribute in &def.observed_attributes {
                if !observed_attributes.contains(attribute) {
                    observed_attributes.push(attribute.clone());
                }
            }
        }

        let non_empty = |v: Vec<EventDecl<C>>| Some(v).filter(|v| !v.is_empty());
        Self {
            name: class.name().to_string(),
            chain: class.chain().map(|def| def.name().to_string()).collect(),
            element: non_empty(element),
            document: non_empty(document),
            window: non_empty(window),
            hub: Some(hub).filter(|v| !v.is_empty()),
            pre_display,
            post_display,
            observed_attributes,
        }
    }

    /// Name of the leaf class
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class names, leaf to root
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub fn element_events(&self) -> Option<&[EventDecl<C>]> {
        self.element.as_deref()
    }

    pub fn document_events(&self) -> Option<&[EventDecl<C>]> {
        self.document.as_deref()
    }

    pub fn window_events(&self) -> Option<&[EventDecl<C>]> {
        self.window.as_deref()
    }

    pub fn hub_events(&self) -> Option<&[HubDecl<C>]> {
        self.hub.as_deref()
    }

    /// Whether any class in the chain listens on the document or window
    pub fn has_parent_events(&self) -> bool {
        self.document.is_some() || self.window.is_some()
    }

    pub fn has_pre_display(&self) -> bool {
        self.pre_display.is_some()
    }

    pub fn has_post_display(&self) -> bool {
        self.post_display.is_some()
    }

    /// Union of every class's observed attributes
    pub fn observed_attributes(&self) -> &[String] {
        &self.observed_attributes
    }

    /// Check every selector and hub address before anything is defined
    pub fn validate(&self) -> Result<(), ComponentError> {
        let events = [&self.element, &self.document, &self.window];
        for decl in events.into_iter().flatten().flatten() {
            if let Some(selector) = &decl.on.selector {
                Selector::parse(selector).map_err(|source| ComponentError::InvalidSelector {
                    class: decl.class.clone(),
                    method: decl.method.clone(),
                    selector: selector.clone(),
                    source,
                })?;
            }
        }
        for decl in self.hub.iter().flatten() {
            if decl.hub.is_empty() {
                return Err(HubError::MissingName.into());
            }
            if decl.topics.split(',').all(|t| t.trim().is_empty()) {
                return Err(HubError::InvalidBindingKey(format!("{}; {}", decl.hub, decl.topics)).into());
            }
        }
        Ok(())
    }
}

impl<C> std::fmt::Debug for ResolvedClass<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedClass")
            .field("name", &self.name)
            .field("chain", &self.chain)
            .field("element", &self.element)
            .field("document", &self.document)
            .field("window", &self.window)
            .field("hub", &self.hub)
            .field("observed_attributes", &self.observed_attributes)
            .finish_non_exhaustive()
    }
}

/// Resolved chains, one per leaf type, computed on first use
#[derive(Default)]
pub(crate) struct ClassCache {
    resolved: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

impl ClassCache {
    pub(crate) fn get_or_resolve<C: Any>(&self, class: impl FnOnce() -> ClassDef<C>) -> Rc<ResolvedClass<C>> {
        let cached = self.resolved.borrow().get(&TypeId::of::<C>()).cloned();
        if let Some(resolved) = cached.and_then(|entry| entry.downcast::<ResolvedClass<C>>().ok()) {
            return resolved;
        }

        let resolved = Rc::new(ResolvedClass::resolve(&class()));
        tracing::debug!(class = resolved.name(), chain = ?resolved.chain(), "class chain resolved");
        self.resolved.borrow_mut().insert(TypeId::of::<C>(), resolved.clone());
        resolved
    }

    pub(crate) fn len(&self) -> usize {
        self.resolved.borrow().len()
    }
}
