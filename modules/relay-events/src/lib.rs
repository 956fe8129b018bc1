//! Events, listeners, and the registry that maps one to the other.
//!
//! Domain-agnostic. An event is any `Send + Sync` value; it opts into
//! propagation control by exposing a [`StoppableEvent`] through
//! [`Event::as_stoppable`]. Listeners are async callables registered per
//! concrete event type and handed out in registration order.

pub mod event;
pub mod listener;
pub mod registry;

pub use event::{Event, Propagation, StoppableEvent};
pub use listener::{Listener, ListenerFn, ListenerRef};
pub use registry::{ListenerProvider, ListenerRegistry};
