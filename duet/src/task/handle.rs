use super::core::Shared;
use super::{Status, Task};
use crate::error::Error;
use crate::routine::{Routine, Step};
use crate::runtime::park;

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

impl<T> Task<T> {
    /// Blocks the calling thread until the task is terminal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitOnDriver`] when called for an unfinished
    /// cooperative task from the thread that owns its scheduler: only that
    /// thread can advance the task, so the wait could never return. Wait on
    /// the [`completion`](Task::completion) future or the
    /// [`wait_routine`](Task::wait_routine) from inside a routine instead.
    pub fn wait(&self) -> Result<Status, Error> {
        self.shared.check_blocking_wait()?;

        let status = park::block_on(self.completion(), None);
        Ok(status.unwrap_or_else(|| self.status()))
    }

    /// Like [`wait`](Task::wait), but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the task is still running when the
    /// timeout elapses, and [`Error::WaitOnDriver`] as `wait` does.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Status, Error> {
        self.shared.check_blocking_wait()?;

        park::block_on(self.completion(), Some(Instant::now() + timeout))
            .ok_or(Error::Timeout(timeout))
    }

    /// A future that resolves to the terminal status.
    ///
    /// The future registers its waker with the task, so it is woken as soon
    /// as the outcome is published. It can be awaited from a future-backed
    /// routine, from any other executor, or blocked on.
    pub fn completion(&self) -> WaitFuture<T> {
        WaitFuture {
            shared: self.shared.clone(),
        }
    }

    /// A step-source that yields until the task is terminal.
    ///
    /// Registering it with a scheduler (or stepping it from another routine)
    /// lets cooperative code wait for a task without blocking any thread.
    /// Each value is single pass: once it reports `Done` it stays done.
    pub fn wait_routine(&self) -> WaitRoutine<T> {
        WaitRoutine {
            shared: self.shared.clone(),
        }
    }
}

impl<T> IntoFuture for Task<T> {
    type Output = Status;
    type IntoFuture = WaitFuture<T>;

    fn into_future(self) -> WaitFuture<T> {
        WaitFuture {
            shared: self.shared,
        }
    }
}

/// Future returned by [`Task::completion`].
pub struct WaitFuture<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Future for WaitFuture<T> {
    type Output = Status;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Status> {
        self.shared.poll_terminal(cx)
    }
}

/// Routine returned by [`Task::wait_routine`].
pub struct WaitRoutine<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Routine for WaitRoutine<T>
where
    T: Send + Sync,
{
    type Output = Status;

    fn step(&mut self) -> anyhow::Result<Step<Status>> {
        Ok(match self.shared.outcome() {
            Some(outcome) => Step::Done(outcome.status()),
            None => Step::Yield,
        })
    }
}
