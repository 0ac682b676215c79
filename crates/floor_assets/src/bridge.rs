use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use thiserror::Error;
use tokio::sync::oneshot;

/// Completion callback handed to a callback-style primitive.
pub type Callback<T> = Box<dyn FnOnce(T) + Send + 'static>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("completion callback was dropped without being invoked")]
pub struct Abandoned;

/// The awaiting end of a [`completion`] pair.
#[derive(Debug)]
pub struct Pending<T>(oneshot::Receiver<T>);

impl<T> Future for Pending<T> {
    type Output = Result<T, Abandoned>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(|r| r.map_err(|_| Abandoned))
    }
}

/// A one-shot result cell split into a callback and a future.
///
/// The callback may run on any thread, before or after the future is first
/// polled. If the future was dropped first, the value is discarded.
pub fn completion<T: Send + 'static>() -> (Callback<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    let callback: Callback<T> = Box::new(move |value| {
        // Receiver gone means the waiter stopped caring; nothing to do.
        let _ = tx.send(value);
    });
    (callback, Pending(rx))
}

/// Starts callback-style work and awaits its single result.
pub async fn bridge<T, F>(start: F) -> Result<T, Abandoned>
where
    T: Send + 'static,
    F: FnOnce(Callback<T>),
{
    let (callback, pending) = completion();
    start(callback);
    pending.await
}
