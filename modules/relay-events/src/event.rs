//! Event capability traits.

use std::sync::atomic::{AtomicBool, Ordering};

/// Anything that can be dispatched.
///
/// Events are shared between concurrently running listeners through
/// `Arc<E>`, so any field a listener mutates must carry its own interior
/// mutability. The dispatcher adds no locking around the event.
pub trait Event: Send + Sync + 'static {
    /// Expose propagation control, if this event supports it.
    ///
    /// Plain events keep the default. Stoppable events return the
    /// [`Propagation`] (or any other [`StoppableEvent`]) they embed.
    fn as_stoppable(&self) -> Option<&dyn StoppableEvent> {
        None
    }
}

/// Events whose listeners may halt delivery to the rest of the sequence.
pub trait StoppableEvent: Send + Sync {
    fn is_propagation_stopped(&self) -> bool;

    /// Idempotent. Once stopped, an event stays stopped.
    fn stop_propagation(&self);
}

/// Monotonic "propagation stopped" flag for events to embed.
///
/// ```
/// use relay_events::{Event, Propagation, StoppableEvent};
///
/// #[derive(Default)]
/// struct UserCreated {
///     propagation: Propagation,
/// }
///
/// impl Event for UserCreated {
///     fn as_stoppable(&self) -> Option<&dyn StoppableEvent> {
///         Some(&self.propagation)
///     }
/// }
///
/// let event = UserCreated::default();
/// event.propagation.stop();
/// assert!(event.as_stoppable().unwrap().is_propagation_stopped());
/// ```
#[derive(Debug, Default)]
pub struct Propagation {
    stopped: AtomicBool,
}

impl Propagation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl StoppableEvent for Propagation {
    fn is_propagation_stopped(&self) -> bool {
        self.is_stopped()
    }

    fn stop_propagation(&self) {
        self.stop();
    }
}
