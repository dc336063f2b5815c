//! Listener handles
//!
//! A `Listener` is the user function as handed to `bind`. Its identity (the
//! pointer of the shared closure) is the key for precise unbinding, so keep a
//! clone of the handle around to remove it later.

use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;

use fos_dom::Event;

type PlainFn = dyn Fn(&mut Event);
type MethodFn = dyn Fn(&dyn Any, &mut Event);

/// User listener with pointer identity
#[derive(Clone)]
pub struct Listener {
    kind: ListenerKind,
}

#[derive(Clone)]
enum ListenerKind {
    /// Called with the event only
    Plain(Rc<PlainFn>),
    /// Called with the bound context as receiver
    Method(Rc<MethodFn>),
}

impl Listener {
    /// Listener that needs no receiver
    pub fn new(f: impl Fn(&mut Event) + 'static) -> Self {
        Self { kind: ListenerKind::Plain(Rc::new(f)) }
    }

    /// Listener invoked with the bound context (`BindOptions::context`) as `&T`
    pub fn method<T: Any>(f: impl Fn(&T, &mut Event) + 'static) -> Self {
        let method = move |ctx: &dyn Any, evt: &mut Event| match ctx.downcast_ref::<T>() {
            Some(receiver) => f(receiver, evt),
            None => tracing::warn!(expected = type_name::<T>(), "listener context has an unexpected type"),
        };
        Self { kind: ListenerKind::Method(Rc::new(method)) }
    }

    /// Does this listener need a bound context?
    pub fn needs_context(&self) -> bool {
        matches!(self.kind, ListenerKind::Method(_))
    }

    /// Same underlying function?
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        self.identity() == other.identity()
    }

    pub(crate) fn identity(&self) -> *const () {
        match &self.kind {
            ListenerKind::Plain(f) => Rc::as_ptr(f) as *const (),
            ListenerKind::Method(f) => Rc::as_ptr(f) as *const (),
        }
    }

    pub(crate) fn call(&self, context: Option<&dyn Any>, evt: &mut Event) {
        match (&self.kind, context) {
            (ListenerKind::Plain(f), _) => f(evt),
            (ListenerKind::Method(f), Some(ctx)) => f(ctx, evt),
            (ListenerKind::Method(_), None) => {
                tracing::warn!(event_type = evt.event_type(), "method listener called without a context")
            }
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&self.identity()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_identity() {
        let a = Listener::new(|_| {});
        let b = Listener::new(|_| {});
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_method_receives_context() {
        struct Counter {
            hits: Cell<u32>,
        }
        let listener = Listener::method(|c: &Counter, _evt| c.hits.set(c.hits.get() + 1));
        assert!(listener.needs_context());

        let counter = Counter { hits: Cell::new(0) };
        let mut evt = Event::new("x");
        listener.call(Some(&counter), &mut evt);
        listener.call(None, &mut evt);
        listener.call(Some(&"wrong type"), &mut evt);
        assert_eq!(counter.hits.get(), 1);
    }
}
