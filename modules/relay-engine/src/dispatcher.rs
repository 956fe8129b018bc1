//! The dispatch loop.
//!
//! ```text
//! dispatch(event)
//!   ├─ stoppable?  for each listener: spawn → wait (or cancel) → stopped? break
//!   └─ plain       spawn all → wait for all (or cancel)   [FanOut::Awaited]
//!                  spawn all → return now                 [FanOut::Detached]
//! ```
//!
//! Every listener runs in its own task. A listener error or panic, and a
//! panicking error handler, stay inside that task. Only the dispatch's
//! cancellation token can fail a dispatch.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use relay_events::{Event, ListenerProvider, ListenerRef};
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info_span, trace, Instrument};
use uuid::Uuid;

use crate::cancel::timeout_token;
use crate::config::{CancelPolicy, DispatcherConfig, FanOut};
use crate::error::{BuildError, DispatchError, ListenerError};
use crate::handle::DispatchHandle;
use crate::handler::{DiscardErrors, ErrorHandler};

/// Dispatches events to the listeners a [`ListenerProvider`] resolves.
///
/// Holds no reference to an event once its dispatch has completed.
pub struct Dispatcher<P> {
    provider: P,
    shared: Arc<Shared>,
}

/// What the per-dispatch driver tasks need, independent of the provider.
struct Shared {
    on_error: Arc<dyn ErrorHandler>,
    executor: Handle,
    config: DispatcherConfig,
}

pub struct DispatcherBuilder<P> {
    provider: P,
    on_error: Option<Arc<dyn ErrorHandler>>,
    executor: Option<Handle>,
    config: DispatcherConfig,
}

impl<P: ListenerProvider> DispatcherBuilder<P> {
    /// Where listener failures go. Defaults to [`DiscardErrors`].
    pub fn on_error(mut self, handler: impl ErrorHandler) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fan_out(mut self, fan_out: FanOut) -> Self {
        self.config.fan_out = fan_out;
        self
    }

    pub fn on_cancel(mut self, policy: CancelPolicy) -> Self {
        self.config.on_cancel = policy;
        self
    }

    /// Runtime that listener and driver tasks are spawned on. Defaults to
    /// the runtime `build` is called from.
    pub fn executor(mut self, handle: Handle) -> Self {
        self.executor = Some(handle);
        self
    }

    pub fn build(self) -> Result<Dispatcher<P>, BuildError> {
        let executor = match self.executor {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };

        Ok(Dispatcher {
            provider: self.provider,
            shared: Arc::new(Shared {
                on_error: self.on_error.unwrap_or_else(|| Arc::new(DiscardErrors)),
                executor,
                config: self.config,
            }),
        })
    }
}

impl<P: Clone> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<P: ListenerProvider> Dispatcher<P> {
    pub fn builder(provider: P) -> DispatcherBuilder<P> {
        DispatcherBuilder {
            provider,
            on_error: None,
            executor: None,
            config: DispatcherConfig::default(),
        }
    }

    /// Dispatcher on the current runtime with default config and
    /// [`DiscardErrors`].
    pub fn new(provider: P) -> Result<Self, BuildError> {
        Self::builder(provider).build()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> DispatcherConfig {
        self.shared.config
    }

    /// Dispatch with a token that never fires.
    pub fn dispatch<E: Event>(&self, event: Arc<E>) -> DispatchHandle<E> {
        self.dispatch_with_cancel(event, CancellationToken::new())
    }

    /// Dispatch, failing with [`DispatchError::Cancelled`] if `after`
    /// elapses first.
    pub fn dispatch_with_timeout<E: Event>(
        &self,
        event: Arc<E>,
        after: Duration,
    ) -> DispatchHandle<E> {
        let _enter = self.shared.executor.enter();
        let token = timeout_token(after);
        self.start(event, token.clone(), Some(token.drop_guard()))
    }

    /// Dispatch `event` to its listeners.
    ///
    /// Returns before any listener runs. Stoppable events are delivered
    /// sequentially; plain events fan out according to the configured
    /// [`FanOut`]. `cancel` applies to the waits, and to the listeners
    /// through child tokens; it is ignored by [`FanOut::Detached`].
    pub fn dispatch_with_cancel<E: Event>(
        &self,
        event: Arc<E>,
        cancel: CancellationToken,
    ) -> DispatchHandle<E> {
        self.start(event, cancel, None)
    }

    /// `release` is dropped once the driver finishes, or right away under
    /// [`FanOut::Detached`].
    fn start<E: Event>(
        &self,
        event: Arc<E>,
        cancel: CancellationToken,
        release: Option<DropGuard>,
    ) -> DispatchHandle<E> {
        let listeners = self.provider.listeners_for(&*event);
        let stoppable = event.as_stoppable().is_some();

        let span = info_span!(
            "dispatch",
            event = std::any::type_name::<E>(),
            dispatch_id = %Uuid::new_v4(),
            listeners = listeners.len()
        );

        let shared = self.shared.clone();
        let driver = if stoppable {
            debug!(parent: &span, "Dispatching stoppable event sequentially");
            let run = shared.clone().run_sequential(event, listeners, cancel);
            shared.executor.spawn(releasing(run, release).instrument(span))
        } else {
            match shared.config.fan_out {
                FanOut::Awaited => {
                    debug!(parent: &span, "Dispatching event to all listeners, awaited");
                    let run = shared.clone().run_fan_out(event, listeners, cancel);
                    shared.executor.spawn(releasing(run, release).instrument(span))
                }
                FanOut::Detached => {
                    debug!(parent: &span, "Dispatching event to all listeners, detached");
                    let _entered = span.enter();
                    for (index, listener) in listeners.into_iter().enumerate() {
                        shared.schedule(index, listener, event.clone(), CancellationToken::new());
                    }
                    return DispatchHandle::ready(event);
                }
            }
        };

        DispatchHandle::running(driver)
    }
}

impl Shared {
    /// Stoppable path. One listener at a time, registration order.
    async fn run_sequential<E: Event>(
        self: Arc<Self>,
        event: Arc<E>,
        listeners: Vec<ListenerRef<E>>,
        cancel: CancellationToken,
    ) -> Result<Arc<E>, DispatchError> {
        let total = listeners.len();

        if cancel.is_cancelled() {
            debug!("Dispatch cancelled before listeners were scheduled");
            return Err(DispatchError::Cancelled);
        }

        for (index, listener) in listeners.into_iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(completed = index, total, "Dispatch cancelled before listener started");
                return Err(DispatchError::Cancelled);
            }

            let name = listener.name().to_string();
            let mut unit = self.schedule(index, listener, event.clone(), cancel.child_token());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.abandon([unit.abort_handle()]);
                    debug!(
                        listener = name.as_str(),
                        completed = index,
                        total,
                        "Dispatch cancelled while waiting for listener"
                    );
                    return Err(DispatchError::Cancelled);
                }
                joined = &mut unit => settle(&name, joined),
            }

            if event
                .as_stoppable()
                .is_some_and(|s| s.is_propagation_stopped())
            {
                debug!(
                    listener = name.as_str(),
                    skipped = total - index - 1,
                    "Propagation stopped"
                );
                break;
            }
        }

        Ok(event)
    }

    /// Awaited fan-out. Everything is scheduled up front, then joined.
    async fn run_fan_out<E: Event>(
        self: Arc<Self>,
        event: Arc<E>,
        listeners: Vec<ListenerRef<E>>,
        cancel: CancellationToken,
    ) -> Result<Arc<E>, DispatchError> {
        if cancel.is_cancelled() {
            debug!("Dispatch cancelled before listeners were scheduled");
            return Err(DispatchError::Cancelled);
        }

        let mut names = Vec::with_capacity(listeners.len());
        let mut units = Vec::with_capacity(listeners.len());
        for (index, listener) in listeners.into_iter().enumerate() {
            names.push(listener.name().to_string());
            units.push(self.schedule(index, listener, event.clone(), cancel.child_token()));
        }
        let aborts: Vec<_> = units.iter().map(JoinHandle::abort_handle).collect();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.abandon(aborts);
                debug!(
                    policy = %self.config.on_cancel,
                    "Dispatch cancelled while waiting for listeners"
                );
                Err(DispatchError::Cancelled)
            }
            joined = join_all(units) => {
                for (name, result) in names.iter().zip(joined) {
                    settle(name, result);
                }
                Ok(event)
            }
        }
    }

    /// Spawn one listener invocation in its own task.
    ///
    /// The task catches the listener's error or panic and hands it to the
    /// error handler. The returned handle only ever fails if the handler
    /// itself panicked or the task was aborted.
    fn schedule<E: Event>(
        &self,
        index: usize,
        listener: ListenerRef<E>,
        event: Arc<E>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        trace!(listener = listener.name(), index, "Scheduling listener");

        let on_error = self.on_error.clone();
        self.executor.spawn(
            async move {
                let outcome = AssertUnwindSafe(listener.handle(event, cancel))
                    .catch_unwind()
                    .await;

                let failure = match outcome {
                    Ok(Ok(())) => return,
                    Ok(Err(error)) => ListenerError::Failed {
                        listener: listener.name().to_string(),
                        error,
                    },
                    Err(payload) => ListenerError::Panicked {
                        listener: listener.name().to_string(),
                        message: panic_message(&*payload),
                    },
                };
                on_error.handle(failure);
            }
            .in_current_span(),
        )
    }

    /// Stop in-flight units on cancellation, if the policy says so.
    fn abandon(&self, units: impl IntoIterator<Item = AbortHandle>) {
        if self.config.on_cancel == CancelPolicy::Abort {
            units.into_iter().for_each(|unit| unit.abort());
        }
    }
}

/// Run a driver, then drop `_release`.
async fn releasing<F: Future>(run: F, _release: Option<DropGuard>) -> F::Output {
    run.await
}

/// Log what the isolation boundary caught. Nothing here reaches the caller.
fn settle(listener: &str, joined: Result<(), JoinError>) {
    match joined {
        Ok(()) => trace!(listener, "Listener completed"),
        Err(e) if e.is_panic() => error!(
            listener,
            panic = %panic_message(&*e.into_panic()),
            "Error handler panicked; continuing dispatch"
        ),
        Err(e) => debug!(listener, error = %e, "Listener task did not complete"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
