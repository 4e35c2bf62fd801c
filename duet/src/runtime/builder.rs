use super::executor::{Executor, WorkerPool};
use super::{Handle, Runtime};
use crate::config::{FaultSink, TaskConfig};
use crate::error::Error;
use crate::time::{Sleeper, ThreadSleeper};

use std::sync::Arc;
use std::thread;

/// Builder for configuring and creating a runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .worker_threads(4)
///     .log_errors(false)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    /// Number of worker threads in the pool.
    worker_threads: usize,

    /// Prefix of worker thread names.
    thread_name: String,

    config: TaskConfig,

    sleeper: Arc<dyn Sleeper>,

    /// Replaces the built-in pool when set.
    executor: Option<Arc<dyn Executor>>,
}

impl RuntimeBuilder {
    /// Creates a builder with default configuration.
    ///
    /// By default the number of worker threads is the number of available
    /// logical CPUs, falling back to `1` if unavailable, and faults are
    /// reported through [`TracingSink`](crate::config::TracingSink).
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            thread_name: String::from("duet-worker"),
            config: TaskConfig::default(),
            sleeper: Arc::new(ThreadSleeper),
            executor: None,
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the prefix of worker thread names.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Sets whether task failures are reported by default.
    pub fn log_errors(mut self, enabled: bool) -> Self {
        self.config = self.config.log_errors(enabled);
        self
    }

    /// Sets where task failures are reported.
    pub fn sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.config = self.config.sink(sink);
        self
    }

    /// Sets the capability behind [`Handle::delay`].
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Runs background tasks on `executor` instead of a built-in pool.
    ///
    /// `worker_threads` and `thread_name` are ignored when set.
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Builds the runtime, starting the worker pool if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if a worker thread cannot be started.
    pub fn build(self) -> Result<Runtime, Error> {
        let (executor, pool) = match self.executor {
            Some(executor) => (executor, None),
            None => {
                let pool = Arc::new(WorkerPool::with_thread_name(self.worker_threads, &self.thread_name)?);
                let executor: Arc<dyn Executor> = pool.clone();
                (executor, Some(pool))
            }
        };

        let handle = Handle::new(executor, self.config, self.sleeper);

        Ok(Runtime::from_parts(handle, pool))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
