//! Listener lookup by concrete event type.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::event::Event;
use crate::listener::{ListenerFn, ListenerRef};

/// Resolves the listeners for an event.
///
/// Implemented by [`ListenerRegistry`]. Also implemented for `Arc<P>` so a
/// registry can stay shared with the code that keeps registering into it.
pub trait ListenerProvider: Send + Sync {
    /// Listeners registered for exactly `E`, in registration order.
    /// Empty when none are registered.
    fn listeners_for<E: Event>(&self, event: &E) -> Vec<ListenerRef<E>>;
}

impl<P: ListenerProvider + ?Sized> ListenerProvider for Arc<P> {
    fn listeners_for<E: Event>(&self, event: &E) -> Vec<ListenerRef<E>> {
        (**self).listeners_for(event)
    }
}

/// In-memory registry keyed by the event's `TypeId`.
///
/// Append-only: no removal, no priorities, no deduplication. Registering the
/// same listener twice makes it run twice.
#[derive(Default)]
pub struct ListenerRegistry {
    // Each value is a `Vec<ListenerRef<E>>` for the `E` whose TypeId keys it.
    listeners: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<E: Event>(&self, listener: ListenerRef<E>) {
        let mut map = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let slot = map.entry(TypeId::of::<E>()).or_insert_with(|| {
            let list: Vec<ListenerRef<E>> = Vec::new();
            Box::new(list) as Box<dyn Any + Send + Sync>
        });

        if let Some(list) = slot.downcast_mut::<Vec<ListenerRef<E>>>() {
            trace!(
                event = std::any::type_name::<E>(),
                listener = listener.name(),
                position = list.len(),
                "Registered listener"
            );
            list.push(listener);
        }
    }

    /// Register a closure as a listener for `E`.
    pub fn on<E, F, Fut>(&self, f: F)
    where
        E: Event,
        F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.add_listener::<E>(Arc::new(ListenerFn::new(f)));
    }

    /// Like [`on`](Self::on), with a name for logs and failure reports.
    pub fn on_named<E, F, Fut>(&self, name: impl Into<Cow<'static, str>>, f: F)
    where
        E: Event,
        F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.add_listener::<E>(Arc::new(ListenerFn::named(name, f)));
    }

    pub fn listener_count<E: Event>(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.downcast_ref::<Vec<ListenerRef<E>>>())
            .map_or(0, Vec::len)
    }
}

impl ListenerProvider for ListenerRegistry {
    fn listeners_for<E: Event>(&self, _event: &E) -> Vec<ListenerRef<E>> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.downcast_ref::<Vec<ListenerRef<E>>>())
            .cloned()
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = self
            .listeners
            .read()
            .map(|map| map.len())
            .unwrap_or_default();
        f.debug_struct("ListenerRegistry")
            .field("event_types", &types)
            .finish()
    }
}
