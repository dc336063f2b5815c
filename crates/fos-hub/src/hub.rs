//! Hub
//!
//! Subscriptions are indexed by topic (label-less), by `(topic, label)` and
//! by namespace. Publishing snapshots the matching subscriptions and
//! releases every borrow before calling out, so handlers may publish,
//! subscribe or unsubscribe re-entrantly.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::{split_list, HubError, HubEventInfo, HubHandler};

/// Options for `Hub::subscribe`
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Tag for bulk removal with `Hub::unsubscribe`
    pub namespace: Option<String>,
    /// Receiver for method handlers, held weakly
    pub context: Option<Weak<dyn Any>>,
}

impl SubscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn context<T: Any>(mut self, context: &Rc<T>) -> Self {
        let context: Rc<dyn Any> = context.clone();
        self.context = Some(Rc::downgrade(&context));
        self
    }
}

struct Subscription {
    topic: String,
    label: Option<String>,
    handler: HubHandler,
    namespace: Option<String>,
    context: Option<Weak<dyn Any>>,
    /// Cleared on unsubscribe so in-flight publishes skip it
    active: Cell<bool>,
}

impl Subscription {
    fn deliver(&self, payload: &Value, label: Option<&str>) {
        if !self.active.get() {
            return;
        }
        let context = match &self.context {
            Some(weak) => match weak.upgrade() {
                Some(ctx) => Some(ctx),
                None => return,
            },
            None => None,
        };
        let info = HubEventInfo {
            topic: self.topic.clone(),
            label: label.map(str::to_string),
            namespace: self.namespace.clone(),
        };
        self.handler.call(context.as_deref(), payload, &info);
    }
}

#[derive(Default)]
struct Subscriptions {
    by_topic: HashMap<String, Vec<Rc<Subscription>>>,
    by_topic_label: HashMap<(String, String), Vec<Rc<Subscription>>>,
    by_namespace: HashMap<String, Vec<Rc<Subscription>>>,
}

struct HubInner {
    name: String,
    subscriptions: RefCell<Subscriptions>,
}

/// A named message bus
#[derive(Clone)]
pub struct Hub {
    inner: Rc<HubInner>,
}

impl Hub {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            inner: Rc::new(HubInner {
                name: name.to_string(),
                subscriptions: RefCell::new(Subscriptions::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn ptr_eq(&self, other: &Hub) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Subscribe `handler` to each topic, or to each `(topic, label)` pair when
    /// `labels` is given. Both lists are comma-separated.
    pub fn subscribe(
        &self,
        topics: &str,
        labels: Option<&str>,
        handler: &HubHandler,
        options: SubscribeOptions,
    ) -> Result<(), HubError> {
        if handler.needs_context() && options.context.is_none() {
            return Err(HubError::MissingContext { topic: topics.to_string() });
        }
        let labels: Vec<&str> = labels.map(|l| split_list(l).collect()).unwrap_or_default();

        let mut subscriptions = self.inner.subscriptions.borrow_mut();
        for topic in split_list(topics) {
            let mut add = |label: Option<&str>| {
                let subscription = Rc::new(Subscription {
                    topic: topic.to_string(),
                    label: label.map(str::to_string),
                    handler: handler.clone(),
                    namespace: options.namespace.clone(),
                    context: options.context.clone(),
                    active: Cell::new(true),
                });
                if let Some(ns) = &options.namespace {
                    subscriptions.by_namespace.entry(ns.clone()).or_default().push(subscription.clone());
                }
                match label {
                    Some(label) => subscriptions
                        .by_topic_label
                        .entry((topic.to_string(), label.to_string()))
                        .or_default()
                        .push(subscription),
                    None => subscriptions.by_topic.entry(topic.to_string()).or_default().push(subscription),
                }
            };
            if labels.is_empty() {
                add(None);
            } else {
                for &label in &labels {
                    add(Some(label));
                }
            }
            tracing::debug!(hub = %self.inner.name, topic, ?labels, namespace = options.namespace.as_deref(), "subscribe");
        }
        Ok(())
    }

    /// Publish `payload` on each topic.
    ///
    /// Per topic: subscribers of each `(topic, label)` pair first, then the
    /// label-less subscribers, each of which is called once per label (or once
    /// with no label when none were published). Registration order holds
    /// within each group.
    pub fn publish(&self, topics: &str, labels: Option<&str>, payload: &Value) {
        let mut labels: Vec<&str> = labels.map(|l| split_list(l).collect()).unwrap_or_default();
        let mut seen = std::collections::HashSet::new();
        labels.retain(|l| seen.insert(*l));

        for topic in split_list(topics) {
            tracing::trace!(hub = %self.inner.name, topic, ?labels, "publish");

            for &label in &labels {
                let matched = self.snapshot_label(topic, label);
                for subscription in matched {
                    subscription.deliver(payload, Some(label));
                }
            }

            let topic_only = self.snapshot_topic(topic);
            for subscription in topic_only {
                if labels.is_empty() {
                    subscription.deliver(payload, None);
                } else {
                    for &label in &labels {
                        subscription.deliver(payload, Some(label));
                    }
                }
            }
        }
    }

    fn snapshot_topic(&self, topic: &str) -> Vec<Rc<Subscription>> {
        self.inner.subscriptions.borrow().by_topic.get(topic).cloned().unwrap_or_default()
    }

    fn snapshot_label(&self, topic: &str, label: &str) -> Vec<Rc<Subscription>> {
        self.inner
            .subscriptions
            .borrow()
            .by_topic_label
            .get(&(topic.to_string(), label.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Remove every subscription tagged with `namespace` across the hub
    pub fn unsubscribe(&self, namespace: &str) -> Result<(), HubError> {
        if namespace.trim().is_empty() {
            return Err(HubError::MissingNamespace);
        }
        let mut subscriptions = self.inner.subscriptions.borrow_mut();
        let Some(removed) = subscriptions.by_namespace.remove(namespace) else {
            return Ok(());
        };
        for subscription in &removed {
            subscription.active.set(false);
            match &subscription.label {
                Some(label) => {
                    let key = (subscription.topic.clone(), label.clone());
                    remove_from(&mut subscriptions.by_topic_label, &key, subscription);
                }
                None => remove_from(&mut subscriptions.by_topic, &subscription.topic, subscription),
            }
        }
        tracing::debug!(hub = %self.inner.name, namespace, count = removed.len(), "unsubscribe");
        Ok(())
    }

    /// Live subscriptions for a topic (`label: None`) or a `(topic, label)` pair
    pub fn subscription_count(&self, topic: &str, label: Option<&str>) -> usize {
        let subscriptions = self.inner.subscriptions.borrow();
        match label {
            Some(label) => subscriptions
                .by_topic_label
                .get(&(topic.to_string(), label.to_string()))
                .map_or(0, Vec::len),
            None => subscriptions.by_topic.get(topic).map_or(0, Vec::len),
        }
    }

    /// Subscriptions tagged with `namespace`
    pub fn namespace_count(&self, namespace: &str) -> usize {
        self.inner.subscriptions.borrow().by_namespace.get(namespace).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").field("name", &self.inner.name).finish_non_exhaustive()
    }
}

fn remove_from<K>(index: &mut HashMap<K, Vec<Rc<Subscription>>>, key: &K, subscription: &Rc<Subscription>)
where
    K: std::hash::Hash + Eq,
{
    if let Some(entries) = index.get_mut(key) {
        entries.retain(|s| !Rc::ptr_eq(s, subscription));
        if entries.is_empty() {
            index.remove(key);
        }
    }
}
