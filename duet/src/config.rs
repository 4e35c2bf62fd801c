//! Task configuration and the diagnostics sink.
//!
//! Whether a faulted task is reported, and where, is decided when the task
//! is built: the runtime or scheduler hands its [`TaskConfig`] to every task
//! it creates, and a task builder can override it per task.

use crate::error::Fault;
use crate::task::TaskId;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Receives failures captured from task execution.
///
/// Reports are fire-and-forget: the sink is called after the fault has been
/// published, exactly once per faulted task, on whichever thread executed
/// the failing work.
pub trait FaultSink: Send + Sync {
    /// Records a captured failure.
    fn report(&self, task: TaskId, name: Option<&str>, fault: &Fault);
}

/// The default sink, which emits one `tracing` error event per fault.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FaultSink for TracingSink {
    fn report(&self, task: TaskId, name: Option<&str>, fault: &Fault) {
        tracing::error!(
            task.id = %task,
            task.name = name.unwrap_or(""),
            panic = fault.is_panic(),
            "task faulted: {fault:#}"
        );
    }
}

/// Per-task execution settings.
#[derive(Clone)]
pub struct TaskConfig {
    /// Whether captured failures are forwarded to the sink.
    log_errors: bool,

    /// Destination of failure reports.
    sink: Arc<dyn FaultSink>,
}

impl TaskConfig {
    /// Creates a configuration that reports faults to [`TracingSink`].
    pub fn new() -> Self {
        Self {
            log_errors: true,
            sink: Arc::new(TracingSink),
        }
    }

    /// Enables or disables fault reporting.
    pub fn log_errors(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    /// Replaces the diagnostics sink.
    pub fn sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns `true` if faults are reported.
    pub fn logs_errors(&self) -> bool {
        self.log_errors
    }

    /// Forwards `fault` to the sink when reporting is enabled.
    ///
    /// A panicking sink is contained here: it must not keep the task's
    /// waiters from being woken.
    pub(crate) fn report(&self, task: TaskId, name: Option<&str>, fault: &Fault) {
        if !self.log_errors {
            return;
        }

        let reported = panic::catch_unwind(AssertUnwindSafe(|| self.sink.report(task, name, fault)));
        if reported.is_err() {
            tracing::warn!(task.id = %task, "fault sink panicked");
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskConfig")
            .field("log_errors", &self.log_errors)
            .finish_non_exhaustive()
    }
}
