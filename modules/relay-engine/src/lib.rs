//! Asynchronous event dispatch engine.
//!
//! Resolves the listeners for an event and runs each one in its own task:
//!
//! - Stoppable events go sequentially, in registration order, and the loop
//!   ends as soon as a listener stops propagation.
//! - Plain events fan out: every listener is scheduled at once and the
//!   dispatch either waits for all of them or returns immediately, as
//!   configured per dispatcher.
//!
//! Listener failures (errors and panics) are isolated per task and routed to
//! an [`ErrorHandler`]. Only cancellation fails a dispatch.

pub mod cancel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod handler;

pub use cancel::timeout_token;
pub use config::{CancelPolicy, DispatcherConfig, FanOut};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{BuildError, DispatchError, ListenerError, ParseConfigError};
pub use handle::DispatchHandle;
pub use handler::{DiscardErrors, ErrorHandler, LogErrors, MemoryErrorSink};
