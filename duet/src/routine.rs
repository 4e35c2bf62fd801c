//! Step-sources for cooperative tasks.
//!
//! A [`Routine`] is work that is advanced one step at a time by a
//! [`Scheduler`](crate::scheduler::Scheduler). Each call to
//! [`step`](Routine::step) either asks to be called again on a later tick
//! ([`Step::Yield`]) or finishes with a value ([`Step::Done`]). Returning an
//! error, or panicking, faults the task that owns the routine.
//!
//! Routines can be written by hand, built from a closure with [`from_fn`],
//! or built from any future with [`from_future`]. A future-backed routine is
//! polled once per tick, which makes `async` blocks a convenient way to write
//! multi-step cooperative code:
//!
//! ```rust,ignore
//! let task = scheduler.spawn_future(async move {
//!     other.completion().await;
//!     yield_now().await;
//!     "done"
//! });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

/// Result of advancing a routine by one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// More work remains; advance again on a later tick.
    Yield,

    /// The routine has finished with a value.
    Done(T),
}

/// A resumable unit of cooperative work.
///
/// The scheduler guarantees that `step` is never called concurrently with
/// itself, and never again once it has returned `Done` or an error.
pub trait Routine: Send {
    /// Value produced when the routine finishes.
    type Output;

    /// Advances the routine by one step.
    fn step(&mut self) -> anyhow::Result<Step<Self::Output>>;
}

impl<R> Routine for Box<R>
where
    R: Routine + ?Sized,
{
    type Output = R::Output;

    fn step(&mut self) -> anyhow::Result<Step<R::Output>> {
        (**self).step()
    }
}

/// Builds a routine from a closure called once per step.
pub fn from_fn<F, T>(f: F) -> FromFn<F>
where
    F: FnMut() -> anyhow::Result<Step<T>> + Send,
{
    FromFn(f)
}

/// Routine returned by [`from_fn`].
pub struct FromFn<F>(F);

impl<F, T> Routine for FromFn<F>
where
    F: FnMut() -> anyhow::Result<Step<T>> + Send,
{
    type Output = T;

    fn step(&mut self) -> anyhow::Result<Step<T>> {
        (self.0)()
    }
}

/// Builds a routine that polls `future` once per step.
pub fn from_future<F>(future: F) -> FutureRoutine<F::Output>
where
    F: Future + Send + 'static,
{
    FutureRoutine {
        future: Box::pin(async move { Ok::<_, anyhow::Error>(future.await) }),
    }
}

/// Builds a routine that polls a fallible `future` once per step.
///
/// An `Err` output faults the task.
pub fn try_from_future<F, T, E>(future: F) -> FutureRoutine<T>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<anyhow::Error>,
{
    FutureRoutine {
        future: Box::pin(async move { future.await.map_err(Into::<anyhow::Error>::into) }),
    }
}

/// Routine returned by [`from_future`] and [`try_from_future`].
///
/// The future is polled with a no-op waker: the scheduler advances every
/// live routine on every tick, so wake-ups carry no information.
pub struct FutureRoutine<T> {
    future: Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>,
}

impl<T> Routine for FutureRoutine<T> {
    type Output = T;

    fn step(&mut self) -> anyhow::Result<Step<T>> {
        let mut cx = Context::from_waker(Waker::noop());

        match self.future.as_mut().poll(&mut cx) {
            Poll::Pending => Ok(Step::Yield),
            Poll::Ready(Ok(value)) => Ok(Step::Done(value)),
            Poll::Ready(Err(err)) => Err(err),
        }
    }
}

/// A future that yields back to the scheduler exactly once.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if !self.0 {
            self.0 = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }

        Poll::Ready(())
    }
}

/// Suspends a future-backed routine until the next tick.
///
/// # Examples
///
/// ```rust,ignore
/// scheduler.spawn_future(async {
///     for frame in 0..3 {
///         println!("frame {frame}");
///         yield_now().await;
///     }
/// });
/// ```
pub async fn yield_now() {
    YieldOnce(false).await
}
