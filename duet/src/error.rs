//! Error types.
//!
//! Three kinds of failure show up in this crate and each has its own type:
//!
//! - [`Error`] is returned synchronously when a task cannot be built or a
//!   wait cannot be honoured (invalid strategy, blocking wait on the driver
//!   thread, missing runtime context, timeouts).
//! - [`Fault`] is a failure captured while a task's function or routine was
//!   running. It is stored in the task and never thrown at the caller that
//!   scheduled the work.
//! - [`TaskError`] is what a caller gets back when it explicitly asks a task
//!   for its result and the task did not succeed.

use crate::task::{Status, TaskId};

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Errors surfaced synchronously by the runtime and the scheduler.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A function was supplied together with [`Strategy::Cooperative`].
    ///
    /// [`Strategy::Cooperative`]: crate::task::Strategy::Cooperative
    #[error("cooperative tasks are driven by a routine, not a function")]
    CooperativeFunction,

    /// A blocking wait was attempted on a cooperative task from the thread
    /// that drives it. The task could never make progress.
    #[error("blocking wait on cooperative task {0} from its driver thread would deadlock")]
    WaitOnDriver(TaskId),

    /// A bounded wait elapsed before the task reached a terminal state.
    #[error("task did not complete within {0:?}")]
    Timeout(Duration),

    /// The worker pool no longer accepts jobs.
    #[error("worker pool is shut down")]
    PoolShutdown,

    /// A background job was dropped by its executor without being run.
    #[error("background job was dropped before it ran")]
    JobDropped,

    /// A routine was registered with a scheduler that has been dropped.
    #[error("scheduler is closed")]
    SchedulerClosed,

    /// No runtime is installed on the current thread.
    #[error("no runtime in the current context")]
    NoRuntime,

    /// No scheduler is installed on the current thread.
    #[error("no scheduler in the current context")]
    NoScheduler,

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A failure captured from a task's function or routine.
///
/// `Fault` wraps an [`anyhow::Error`] behind an `Arc`, so every observer of
/// a faulted task sees the very same error value. Panics are captured as
/// well and show up as a [`Panicked`] error carrying the panic message.
#[derive(Clone)]
pub struct Fault(Arc<anyhow::Error>);

impl Fault {
    /// Wraps any error as a fault.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self(Arc::new(error.into()))
    }

    /// Builds a fault from a plain message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::new(anyhow::Error::msg(message))
    }

    /// Converts a panic payload caught at an execution boundary.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::from("task panicked")
        };

        Self::new(Panicked(message))
    }

    /// Returns the underlying error.
    pub fn error(&self) -> &anyhow::Error {
        &self.0
    }

    /// Returns `true` if the fault was produced by a panic.
    pub fn is_panic(&self) -> bool {
        self.0.is::<Panicked>()
    }

    /// Attempts to downcast the underlying error to a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// Returns `true` if both faults share the same captured error.
    pub fn ptr_eq(&self, other: &Fault) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// A panic caught while running a task, with its message.
#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct Panicked(String);

impl Panicked {
    /// The panic message, or `"task panicked"` for non-string payloads.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Why a task could not hand out its result.
#[derive(thiserror::Error, Debug, Clone)]
pub enum TaskError {
    /// The task has not reached a terminal state yet.
    #[error("task has not completed (status: {0})")]
    NotCompleted(Status),

    /// The task's function or routine failed.
    #[error(transparent)]
    Faulted(#[from] Fault),

    /// Observation of the task was abandoned before it completed.
    #[error("task was cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::panic;

    #[test]
    fn static_str_panic_keeps_message() {
        let payload = panic::catch_unwind(|| -> u32 { panic!("boom") }).unwrap_err();
        let fault = Fault::from_panic(payload);

        assert!(fault.is_panic());
        assert_eq!(fault.to_string(), "boom");
    }

    #[test]
    fn formatted_panic_keeps_message() {
        let code = 7;
        let payload = panic::catch_unwind(|| -> u32 { panic!("bad code {code}") }).unwrap_err();
        let fault = Fault::from_panic(payload);

        assert_eq!(fault.to_string(), "bad code 7");
        assert_eq!(fault.downcast_ref::<Panicked>().unwrap().message(), "bad code 7");
    }

    #[test]
    fn opaque_panic_payload() {
        let payload = panic::catch_unwind(|| -> u32 { panic::panic_any(42u32) }).unwrap_err();
        let fault = Fault::from_panic(payload);

        assert_eq!(fault.to_string(), "task panicked");
    }

    #[test]
    fn clones_share_the_error() {
        let fault = Fault::msg("shared");
        let clone = fault.clone();

        assert!(fault.ptr_eq(&clone));
        assert!(!fault.is_panic());
        assert!(!fault.ptr_eq(&Fault::msg("shared")));
    }

    #[test]
    fn task_error_is_transparent_over_faults() {
        let err = TaskError::from(Fault::msg("boom"));
        assert_eq!(err.to_string(), "boom");

        let err = TaskError::NotCompleted(Status::Running);
        assert_eq!(err.to_string(), "task has not completed (status: running)");
    }
}
