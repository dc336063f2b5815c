//! Lifecycle controller
//!
//! `connected` and `disconnected` are the attach and detach transitions of a
//! component instance. Both are idempotent: the host may deliver either one
//! redundantly without producing duplicate bindings.
//!
//! - element-scoped bindings are made once and kept for the instance's life
//! - hub subscriptions are dropped on every detach and restored on attach
//! - document and window bindings are dropped one frame after a detach, and
//!   only if the element is still detached by then
//!
//! Binding failures are logged, never raised: attach and detach run inside
//! host reactions that have no caller to report to.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use fos_dom::EventTarget;
use fos_events::{EventError, EventMap};
use fos_hub::HubError;

use crate::class::{DisplayHook, EventDecl};
use crate::component::Component;

/// Attach transition
///
/// Display hooks see `first_call == true` until `init` has completed once. A
/// panicking `init` unwinds out of the attach before any hook is scheduled,
/// so the attach that retries it is the first to run hooks.
pub fn connected<C: Component>(component: &Rc<C>) {
    let host = component.host();
    let state = &host.state;
    let first_call = !state.initialized.get();
    state.connect_count.set(state.connect_count.get() + 1);
    tracing::debug!(uid = host.uid(), first_call, "component connected");

    if !state.element_bound.replace(true) {
        bind_element_events(component);
    }
    if !state.hub_active.get() {
        bind_hub_events(component);
        state.hub_active.set(true);
    }
    if !state.parent_active.get() {
        bind_parent_events(component);
        state.parent_active.set(true);
    }

    if !state.initialized.get() && !state.init_running.get() {
        let _running = InitGuard::enter(&state.init_running);
        component.init();
        state.initialized.set(true);
        tracing::debug!(uid = host.uid(), "component initialized");
    }

    schedule_display_hooks(component, first_call);
}

/// Detach transition
pub fn disconnected<C: Component>(component: &Rc<C>) {
    let host = component.host();
    let state = &host.state;
    tracing::debug!(uid = host.uid(), "component disconnected");

    if state.hub_active.replace(false) {
        for name in state.hub_names.take() {
            let Some(hub) = host.hubs().get(&name) else { continue };
            if let Err(err) = hub.unsubscribe(host.uid()) {
                tracing::error!(uid = host.uid(), hub = %name, %err, "hub unsubscribe failed");
            }
        }
    }

    if state.parent_active.get() && !state.detach_check_scheduled.replace(true) {
        let weak = Rc::downgrade(component);
        host.document().request_animation_frame(move |_| {
            let Some(component) = weak.upgrade() else { return };
            let host = component.host();
            host.state.detach_check_scheduled.set(false);
            if host.is_connected() || !host.state.parent_active.get() {
                return;
            }
            host.events()
                .unbind_namespace([EventTarget::DOCUMENT, EventTarget::Window], host.uid());
            host.state.parent_active.set(false);
            tracing::debug!(uid = host.uid(), "document and window bindings released");
        });
    }
}

/// Clears the re-entrancy flag around `init`, also when it unwinds
struct InitGuard<'a>(&'a Cell<bool>);

impl<'a> InitGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn bind_element_events<C: Component>(component: &Rc<C>) {
    let host = component.host();
    let resolved = host.runtime().resolved::<C>();
    let root = host.event_root();

    for decl in resolved.element_events().unwrap_or_default() {
        report_event_error(host.uid(), bind_decl(component, root, decl, false));
    }
    if let Some(map) = component.events() {
        report_event_error(host.uid(), bind_map(component, EventTarget::Node(host.node()), &map, false));
    }
}

fn bind_parent_events<C: Component>(component: &Rc<C>) {
    let host = component.host();
    let resolved = host.runtime().resolved::<C>();

    let scopes = [
        (EventTarget::DOCUMENT, resolved.document_events(), component.doc_events()),
        (EventTarget::Window, resolved.window_events(), component.win_events()),
    ];
    for (target, decls, map) in scopes {
        for decl in decls.unwrap_or_default() {
            report_event_error(host.uid(), bind_decl(component, target, decl, true));
        }
        if let Some(map) = map {
            report_event_error(host.uid(), bind_map(component, target, &map, true));
        }
    }
}

fn bind_decl<C: Component>(
    component: &Rc<C>,
    target: EventTarget,
    decl: &EventDecl<C>,
    skip_if_detached: bool,
) -> Result<(), EventError> {
    let host = component.host();
    let mut options = host.bind_options(component);
    if skip_if_detached {
        options = options.skip_if_detached(host.node());
    }
    host.events().bind(
        target,
        &decl.on.types,
        decl.on.selector.as_deref(),
        &decl.listener(),
        decl.on.bind_options(options),
    )
}

fn bind_map<C: Component>(
    component: &Rc<C>,
    target: EventTarget,
    map: &EventMap,
    skip_if_detached: bool,
) -> Result<(), EventError> {
    let host = component.host();
    let mut options = host.bind_options(component);
    if skip_if_detached {
        options = options.skip_if_detached(host.node());
    }
    host.events().bind_map(target, map, &options)
}

fn bind_hub_events<C: Component>(component: &Rc<C>) {
    let host = component.host();
    let resolved = host.runtime().resolved::<C>();
    let mut names: Vec<String> = Vec::new();

    for decl in resolved.hub_events().unwrap_or_default() {
        let result = host.hubs().get_or_create(&decl.hub).and_then(|hub| {
            hub.subscribe(&decl.topics, decl.labels.as_deref(), &decl.handler(), host.subscribe_options(component))
        });
        report_hub_error(host.uid(), result);
        if !names.contains(&decl.hub) {
            names.push(decl.hub.clone());
        }
    }
    if let Some(bindings) = component.hub_events() {
        report_hub_error(
            host.uid(),
            host.hubs().bind_hub_events(&bindings, &host.subscribe_options(component)),
        );
        for name in bindings.hub_names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    *host.state.hub_names.borrow_mut() = names;
}

fn schedule_display_hooks<C: Component>(component: &Rc<C>, first_call: bool) {
    let host = component.host();
    let resolved = host.runtime().resolved::<C>();
    let document = host.document();

    if let Some(hook) = resolved.pre_display.clone() {
        if !host.state.pre_display_scheduled.replace(true) {
            let weak = Rc::downgrade(component);
            document.request_animation_frame(move |_| {
                run_display_hook(&weak, &hook, first_call, |c| &c.host().state.pre_display_scheduled);
            });
        }
    }

    if let Some(hook) = resolved.post_display.clone() {
        if !host.state.post_display_scheduled.replace(true) {
            let weak = Rc::downgrade(component);
            let next = document.downgrade();
            document.request_animation_frame(move |_| {
                let Some(document) = next.upgrade() else { return };
                document.request_animation_frame(move |_| {
                    run_display_hook(&weak, &hook, first_call, |c| &c.host().state.post_display_scheduled);
                });
            });
        }
    }
}

fn run_display_hook<C: Component>(
    weak: &Weak<C>,
    hook: &DisplayHook<C>,
    first_call: bool,
    scheduled: impl Fn(&C) -> &Cell<bool>,
) {
    let Some(component) = weak.upgrade() else { return };
    scheduled(&component).set(false);
    hook(&component, first_call);
}

fn report_event_error(uid: &str, result: Result<(), EventError>) {
    if let Err(err) = result {
        tracing::error!(uid, %err, "event binding failed");
    }
}

fn report_hub_error(uid: &str, result: Result<(), HubError>) {
    if let Err(err) = result {
        tracing::error!(uid, %err, "hub binding failed");
    }
}
