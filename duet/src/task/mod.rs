//! Task handles and their lifecycle.
//!
//! A [`Task`] is created in one of four shapes:
//!
//! | Shape | Created by | Strategy | Initial status |
//! |---|---|---|---|
//! | value | [`Task::from_value`] | `Custom` | `Success` |
//! | failure | [`Task::from_fault`], [`Task::from_error`] | `Custom` | `Faulted` |
//! | function | [`Handle::run`](crate::Handle::run), [`run`] | `Background` | `Pending` |
//! | routine | [`Scheduler::spawn`](crate::Scheduler::spawn), [`spawn_routine`] | `Cooperative` | `Pending` |
//!
//! Whatever the shape, observers use the same surface: status polling,
//! blocking waits, the completion future and the wait routine.
//!
//! The free functions in this module use the runtime or scheduler installed
//! on the current thread: worker threads, [`Handle::enter`](crate::Handle::enter)
//! and scheduler ticks all install one.

mod builder;
mod core;
mod handle;
mod id;
mod outcome;
mod set;
mod state;

pub(crate) use self::core::{BackgroundJob, Kind, Shared};

pub use builder::Builder;
pub use self::core::Task;
pub use handle::{WaitFuture, WaitRoutine};
pub use id::TaskId;
pub use outcome::Outcome;
pub use set::{AnyTask, TaskSet};
pub use state::{Status, Strategy};

use crate::error::Error;
use crate::routine::Routine;
use crate::runtime::context;

use std::future::Future;

/// Runs `f` on the current runtime's worker pool.
///
/// # Errors
///
/// Returns [`Error::NoRuntime`] outside of a runtime context.
pub fn run<F, T>(f: F) -> Result<Task<T>, Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + Sync + 'static,
{
    Ok(context::current_runtime()?.run(f))
}

/// Runs the fallible `f` on the current runtime's worker pool.
///
/// # Errors
///
/// Returns [`Error::NoRuntime`] outside of a runtime context.
pub fn try_run<F, T, E>(f: F) -> Result<Task<T>, Error>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + Sync + 'static,
    E: Into<anyhow::Error>,
{
    Ok(context::current_runtime()?.try_run(f))
}

/// Runs `f` with the given strategy on the current runtime.
///
/// # Errors
///
/// Returns [`Error::NoRuntime`] outside of a runtime context and
/// [`Error::CooperativeFunction`] for [`Strategy::Cooperative`].
pub fn run_with<F, T>(strategy: Strategy, f: F) -> Result<Task<T>, Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + Sync + 'static,
{
    context::current_runtime()?.run_with(strategy, f)
}

/// Registers `routine` with the scheduler currently ticking on this thread.
///
/// # Errors
///
/// Returns [`Error::NoScheduler`] outside of a scheduler tick.
pub fn spawn_routine<R>(routine: R) -> Result<Task<R::Output>, Error>
where
    R: Routine + 'static,
    R::Output: Send + Sync + 'static,
{
    Ok(context::current_scheduler()?.spawn(routine))
}

/// Registers `future` as a routine with the scheduler currently ticking on
/// this thread.
///
/// # Errors
///
/// Returns [`Error::NoScheduler`] outside of a scheduler tick.
pub fn spawn_future<F>(future: F) -> Result<Task<F::Output>, Error>
where
    F: Future + Send + 'static,
    F::Output: Send + Sync + 'static,
{
    Ok(context::current_scheduler()?.spawn_future(future))
}
