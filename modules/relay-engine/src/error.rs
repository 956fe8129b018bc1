use thiserror::Error;

/// A failure captured from a single listener invocation.
///
/// Never returned from a dispatch; delivered to the dispatcher's
/// [`ErrorHandler`](crate::ErrorHandler) instead.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Listener {listener} failed: {error:#}")]
    Failed {
        listener: String,
        error: anyhow::Error,
    },

    #[error("Listener {listener} panicked: {message}")]
    Panicked { listener: String, message: String },
}

impl ListenerError {
    pub fn listener(&self) -> &str {
        match self {
            ListenerError::Failed { listener, .. } | ListenerError::Panicked { listener, .. } => {
                listener
            }
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, ListenerError::Panicked { .. })
    }
}

/// Why a dispatch did not resolve with its event.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatch cancelled")]
    Cancelled,

    /// The task driving the dispatch did not finish (runtime shutdown).
    #[error("Dispatch aborted: {0}")]
    Aborted(String),
}

impl DispatchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No tokio runtime available; call from within a runtime or provide an executor")]
    NoRuntime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} '{value}'")]
pub struct ParseConfigError {
    pub(crate) kind: &'static str,
    pub(crate) value: String,
}
