//! fOS Components - Custom element lifecycle
//!
//! Components declare a class chain (`ClassDef`) with event and hub bindings
//! bound to methods. The first time a leaf class is used its chain is
//! resolved with override-by-method-name semantics and cached. The lifecycle
//! controller binds and unbinds those declarations as the host connects and
//! disconnects the element, runs `init` once, and schedules the pre- and
//! post-display hooks on animation frames.
//!
//! # Example
//! ```rust,ignore
//! struct Counter { host: ComponentHost, clicks: Cell<u32> }
//!
//! impl Component for Counter {
//!     fn class() -> ClassDef<Self> {
//!         ClassDef::new("counter")
//!             .on_event("increment", On::element("click").selector("button"), |c: &Self, _evt| {
//!                 c.clicks.set(c.clicks.get() + 1)
//!             })
//!     }
//!     fn create(host: ComponentHost) -> Self { Self { host, clicks: Cell::new(0) } }
//!     fn host(&self) -> &ComponentHost { &self.host }
//! }
//!
//! let runtime = Runtime::new(&Document::default());
//! runtime.define::<Counter>("x-counter")?;
//! ```

mod class;
mod resolve;
mod component;
mod config;
mod error;
mod runtime;
pub mod lifecycle;

pub use class::{ClassDef, EventDecl, EventScope, HubDecl, On};
pub use resolve::ResolvedClass;
pub use component::{Component, ComponentHost};
pub use config::RuntimeConfig;
pub use error::ComponentError;
pub use runtime::Runtime;

pub use fos_dom::{Document, Event, EventTarget, NodeId};
pub use fos_events::{BindOptions, EventMap, EventRegistry, Listener};
pub use fos_hub::{HubBindings, HubEventInfo, HubHandler, HubRegistry, SubscribeOptions, Value};
