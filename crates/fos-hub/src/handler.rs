//! Hub handlers

use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

/// Addressing of one delivery, passed next to the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubEventInfo {
    pub topic: String,
    pub label: Option<String>,
    /// Namespace of the receiving subscription
    pub namespace: Option<String>,
}

type PlainFn = dyn Fn(&Value, &HubEventInfo);
type MethodFn = dyn Fn(&dyn Any, &Value, &HubEventInfo);

/// Subscriber callback
#[derive(Clone)]
pub struct HubHandler {
    kind: HandlerKind,
}

#[derive(Clone)]
enum HandlerKind {
    Plain(Rc<PlainFn>),
    Method(Rc<MethodFn>),
}

impl HubHandler {
    pub fn new(f: impl Fn(&Value, &HubEventInfo) + 'static) -> Self {
        Self { kind: HandlerKind::Plain(Rc::new(f)) }
    }

    /// Handler invoked with the subscription context as `&T`
    pub fn method<T: Any>(f: impl Fn(&T, &Value, &HubEventInfo) + 'static) -> Self {
        let method = move |ctx: &dyn Any, payload: &Value, info: &HubEventInfo| match ctx.downcast_ref::<T>() {
            Some(receiver) => f(receiver, payload, info),
            None => tracing::warn!(expected = type_name::<T>(), topic = %info.topic, "hub context has an unexpected type"),
        };
        Self { kind: HandlerKind::Method(Rc::new(method)) }
    }

    pub fn needs_context(&self) -> bool {
        matches!(self.kind, HandlerKind::Method(_))
    }

    pub fn ptr_eq(&self, other: &HubHandler) -> bool {
        self.identity() == other.identity()
    }

    fn identity(&self) -> *const () {
        match &self.kind {
            HandlerKind::Plain(f) => Rc::as_ptr(f) as *const (),
            HandlerKind::Method(f) => Rc::as_ptr(f) as *const (),
        }
    }

    pub(crate) fn call(&self, context: Option<&dyn Any>, payload: &Value, info: &HubEventInfo) {
        match (&self.kind, context) {
            (HandlerKind::Plain(f), _) => f(payload, info),
            (HandlerKind::Method(f), Some(ctx)) => f(ctx, payload, info),
            (HandlerKind::Method(_), None) => {
                tracing::warn!(topic = %info.topic, "method handler called without a context")
            }
        }
    }
}

impl fmt::Debug for HubHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HubHandler").field(&self.identity()).finish()
    }
}
