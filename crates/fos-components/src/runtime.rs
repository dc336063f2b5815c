//! Component runtime
//!
//! Owns the document, the event and hub registries, the resolved class cache
//! and the configuration, and registers components with the document's
//! custom element registry.

use std::any::type_name;
use std::rc::{Rc, Weak};

use fos_dom::{CustomElementCallbacks, CustomElementInstance, CustomElementOptions, Document, NodeId};
use fos_events::EventRegistry;
use fos_hub::HubRegistry;

use crate::component::{Component, ComponentHost};
use crate::config::RuntimeConfig;
use crate::error::ComponentError;
use crate::lifecycle;
use crate::resolve::{ClassCache, ResolvedClass};

pub(crate) struct RuntimeInner {
    document: Document,
    events: EventRegistry,
    hubs: HubRegistry,
    classes: ClassCache,
    config: RuntimeConfig,
}

/// Shared component runtime (cheap to clone)
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Runtime over `document` using the thread's default hub registry
    pub fn new(document: &Document) -> Self {
        Self::with_config(document, RuntimeConfig::default())
    }

    pub fn with_config(document: &Document, config: RuntimeConfig) -> Self {
        Self::with_hub_registry(document, fos_hub::default_registry(), config)
    }

    /// Runtime with its own hub registry, isolated from the default one
    pub fn with_hub_registry(document: &Document, hubs: HubRegistry, config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                document: document.clone(),
                events: EventRegistry::new(document),
                hubs,
                classes: ClassCache::default(),
                config,
            }),
        }
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn events(&self) -> &EventRegistry {
        &self.inner.events
    }

    pub fn hubs(&self) -> &HubRegistry {
        &self.inner.hubs
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// The merged class chain of `C`, resolved on first use
    pub fn resolved<C: Component>(&self) -> Rc<ResolvedClass<C>> {
        self.inner.classes.get_or_resolve(C::class)
    }

    /// Register `C` as the implementation of `<tag>`.
    ///
    /// Existing `<tag>` elements are upgraded at once and connected ones get
    /// their attach transition.
    pub fn define<C: Component>(&self, tag: &str) -> Result<(), ComponentError> {
        let resolved = self.resolved::<C>();
        resolved.validate()?;

        let runtime: Weak<RuntimeInner> = Rc::downgrade(&self.inner);
        let constructor = Rc::new(move |_: &Document, node: NodeId| {
            let inner = runtime.upgrade()?;
            let host = ComponentHost::new(Runtime { inner }, node);
            tracing::debug!(uid = host.uid(), ?node, component = type_name::<C>(), "component created");
            let component = Rc::new(C::create(host));
            let reactions = Rc::new(ComponentReactions { component: component.clone() });
            Some(CustomElementInstance::new(reactions, component))
        });
        let options = CustomElementOptions {
            observed_attributes: resolved.observed_attributes().to_vec(),
        };
        self.inner.document.define(tag, constructor, options)?;
        tracing::debug!(tag, class = resolved.name(), "component defined");
        Ok(())
    }

    /// Create a detached `<tag>` element and return its `C` instance
    pub fn create<C: Component>(&self, tag: &str) -> Result<Rc<C>, ComponentError> {
        let node = self.inner.document.create_element(tag);
        self.component::<C>(node).ok_or_else(|| ComponentError::NotUpgraded {
            tag: tag.to_string(),
            component: type_name::<C>(),
        })
    }

    /// The `C` instance behind `node`, if it was upgraded to one
    pub fn component<C: Component>(&self, node: NodeId) -> Option<Rc<C>> {
        self.inner.document.custom_element::<C>(node)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("url", &self.inner.document.url())
            .field("config", &self.inner.config)
            .field("classes", &self.inner.classes.len())
            .finish_non_exhaustive()
    }
}

/// Routes host reactions into the lifecycle controller
struct ComponentReactions<C> {
    component: Rc<C>,
}

impl<C: Component> CustomElementCallbacks for ComponentReactions<C> {
    fn connected(&self) {
        lifecycle::connected(&self.component);
    }

    fn disconnected(&self) {
        lifecycle::disconnected(&self.component);
    }

    fn attribute_changed(&self, name: &str, old: Option<&str>, new: Option<&str>) {
        self.component.attribute_changed(name, old, new);
    }
}
