//! Cancellation token helpers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A token that cancels itself once `after` has elapsed.
///
/// Backed by a timer task on the current runtime, which exits early if the
/// token is cancelled by other means. Must be called from within a runtime.
pub fn timeout_token(after: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(after) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });
    token
}
