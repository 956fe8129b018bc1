//! Error handlers: where captured listener failures go.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::ListenerError;

/// Receives every listener failure, once per failing invocation.
///
/// Runs inside the failing listener's task. A handler that panics does not
/// affect the dispatch: the panic is logged and the remaining listeners run
/// as usual.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: ListenerError);
}

impl<F> ErrorHandler for F
where
    F: Fn(ListenerError) + Send + Sync + 'static,
{
    fn handle(&self, error: ListenerError) {
        self(error)
    }
}

/// Default handler. Drops the error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardErrors;

impl ErrorHandler for DiscardErrors {
    fn handle(&self, error: ListenerError) {
        debug!(listener = error.listener(), error = %error, "Discarding listener error");
    }
}

/// Emits each failure as a `warn` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogErrors;

impl ErrorHandler for LogErrors {
    fn handle(&self, error: ListenerError) {
        warn!(
            listener = error.listener(),
            panicked = error.is_panic(),
            error = %error,
            "Listener failed"
        );
    }
}

/// In-memory collector for asserting on listener failures. Cloning shares
/// the underlying buffer, so keep one clone and hand the other to the
/// dispatcher.
#[derive(Debug, Clone, Default)]
pub struct MemoryErrorSink {
    errors: Arc<Mutex<Vec<ListenerError>>>,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Rendered messages of every captured error, in capture order.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    /// Drain the captured errors.
    pub fn take(&self) -> Vec<ListenerError> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ListenerError>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ErrorHandler for MemoryErrorSink {
    fn handle(&self, error: ListenerError) {
        self.lock().push(error);
    }
}
