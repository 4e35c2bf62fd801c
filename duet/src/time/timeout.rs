use super::sleep::{Sleep, sleep};
use crate::error::Error;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Bounds how long `future` may take.
///
/// Resolves to `Err(Error::Timeout)` if the deadline passes first. The
/// inner future is dropped at that point, which for a
/// [`completion`](crate::Task::completion) future only stops the waiting,
/// not the task.
///
/// # Examples
///
/// ```rust,ignore
/// scheduler.spawn_future(async move {
///     match timeout(Duration::from_secs(1), loader.completion()).await {
///         Ok(status) => status,
///         Err(_) => { loader.cancel(); Status::Cancelled }
///     }
/// });
/// ```
pub fn timeout<F>(duration: Duration, future: F) -> Timeout<F>
where
    F: Future,
{
    Timeout {
        future: Box::pin(future),
        sleep: sleep(duration),
        duration,
    }
}

/// Future returned by [`timeout`].
pub struct Timeout<F> {
    future: Pin<Box<F>>,
    sleep: Sleep,
    duration: Duration,
}

impl<F> Future for Timeout<F>
where
    F: Future,
{
    type Output = Result<F::Output, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Poll::Ready(value) = this.future.as_mut().poll(cx) {
            return Poll::Ready(Ok(value));
        }

        if let Poll::Ready(()) = Pin::new(&mut this.sleep).poll(cx) {
            return Poll::Ready(Err(Error::Timeout(this.duration)));
        }

        Poll::Pending
    }
}
