//! Listener trait and the closure adapter.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

/// Shared handle to a listener, as stored by registries.
pub type ListenerRef<E> = Arc<dyn Listener<E>>;

/// A unit of side-effecting work run for every dispatched `E`.
///
/// `cancel` fires when the dispatch that invoked this listener is cancelled
/// or times out. Honouring it is optional: the dispatcher stops waiting
/// either way, but only a cooperating listener actually stops working.
#[async_trait]
pub trait Listener<E: Event>: Send + Sync + 'static {
    /// Used in logs and in failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, event: Arc<E>, cancel: CancellationToken) -> Result<()>;
}

/// Closure-backed listener.
///
/// Wraps `F: Fn(Arc<E>, CancellationToken) -> Fut`, producing a fresh future
/// per invocation. Shared state belongs in an explicit `Arc` captured by the
/// closure.
///
/// ```
/// use std::sync::Arc;
/// use relay_events::{Event, ListenerFn, ListenerRef};
/// use tokio_util::sync::CancellationToken;
///
/// struct Ping;
/// impl Event for Ping {}
///
/// let listener: ListenerRef<Ping> =
///     ListenerFn::named("ping", |_event: Arc<Ping>, _cancel: CancellationToken| async {
///         anyhow::Ok(())
///     })
///     .into_ref();
/// assert_eq!(listener.name(), "ping");
/// ```
#[derive(Debug)]
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenerFn<F> {
    pub fn new(f: F) -> Self {
        Self {
            name: Cow::Borrowed(std::any::type_name::<F>()),
            f,
        }
    }

    pub fn named(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }

    /// Erase into the shared handle registries store.
    pub fn into_ref<E>(self) -> ListenerRef<E>
    where
        E: Event,
        Self: Listener<E>,
    {
        Arc::new(self)
    }
}

#[async_trait]
impl<E, F, Fut> Listener<E> for ListenerFn<F>
where
    E: Event,
    F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Arc<E>, cancel: CancellationToken) -> Result<()> {
        (self.f)(event, cancel).await
    }
}
