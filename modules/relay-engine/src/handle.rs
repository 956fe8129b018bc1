use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use tokio::task::JoinHandle;

use crate::error::DispatchError;

/// Completion of one dispatch. Resolves with the dispatched event (the same
/// `Arc`) or with [`DispatchError::Cancelled`].
///
/// Dropping the handle does not stop the dispatch; it keeps running in the
/// background.
#[must_use = "dropping a DispatchHandle detaches the dispatch"]
#[derive(Debug)]
pub struct DispatchHandle<E> {
    state: State<E>,
}

#[derive(Debug)]
enum State<E> {
    Ready(Arc<E>),
    Running(JoinHandle<Result<Arc<E>, DispatchError>>),
    Done,
}

impl<E> DispatchHandle<E> {
    pub(crate) fn ready(event: Arc<E>) -> Self {
        Self {
            state: State::Ready(event),
        }
    }

    pub(crate) fn running(task: JoinHandle<Result<Arc<E>, DispatchError>>) -> Self {
        Self {
            state: State::Running(task),
        }
    }

    /// Whether awaiting the handle would complete without waiting.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Ready(_) | State::Done => true,
            State::Running(task) => task.is_finished(),
        }
    }
}

impl<E> Future for DispatchHandle<E> {
    type Output = Result<Arc<E>, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let output = match &mut this.state {
            State::Ready(event) => Ok(event.clone()),
            State::Running(task) => match ready!(Pin::new(task).poll(cx)) {
                Ok(result) => result,
                Err(e) => Err(DispatchError::Aborted(e.to_string())),
            },
            State::Done => Err(DispatchError::Aborted(
                "dispatch handle polled after completion".into(),
            )),
        };
        this.state = State::Done;
        Poll::Ready(output)
    }
}
