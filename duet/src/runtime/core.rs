use super::context;
use super::executor::{Executor, Job, WorkerPool};
use crate::config::TaskConfig;
use crate::error::{Error, Fault};
use crate::scheduler::Scheduler;
use crate::task::{BackgroundJob, Builder, Kind, Outcome, Shared, Strategy, Task};
use crate::time::Sleeper;

use std::fmt;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// The runtime: a worker pool for background tasks plus the configuration
/// every task created through it inherits.
///
/// `Runtime` derefs to its [`Handle`], which carries the task-creating API.
/// Dropping the runtime shuts the pool down; background tasks still queued
/// at that point fault with [`Error::JobDropped`].
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new().worker_threads(2).build()?;
///
/// let task = runtime.run(|| 21 * 2);
/// task.wait()?;
/// assert_eq!(task.result(), Some(&42));
/// ```
pub struct Runtime {
    handle: Handle,

    /// Present when the runtime owns its pool rather than a custom executor.
    pool: Option<Arc<WorkerPool>>,
}

impl Runtime {
    /// Builds a runtime with the default configuration.
    pub fn new() -> Result<Self, Error> {
        super::RuntimeBuilder::new().build()
    }

    pub(crate) fn from_parts(handle: Handle, pool: Option<Arc<WorkerPool>>) -> Self {
        Self { handle, pool }
    }

    /// Returns a cloneable handle to this runtime.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Deref for Runtime {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.handle
    }
}

impl Drop for Runtime {
    /// Stops the worker pool and waits for its threads.
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
            pool.join();
        }
    }
}

/// A cloneable, thread-safe reference to a [`Runtime`].
#[derive(Clone)]
pub struct Handle {
    inner: Arc<Inner>,
}

struct Inner {
    executor: Arc<dyn Executor>,

    config: TaskConfig,

    sleeper: Arc<dyn Sleeper>,
}

impl Handle {
    pub(crate) fn new(executor: Arc<dyn Executor>, config: TaskConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                config,
                sleeper,
            }),
        }
    }

    /// Configuration inherited by tasks created through this runtime.
    pub fn config(&self) -> &TaskConfig {
        &self.inner.config
    }

    /// Starts configuring a task.
    pub fn task(&self) -> Builder<'_, Handle> {
        Builder::new(self, self.inner.config.clone())
    }

    /// Runs `f` on a worker thread.
    ///
    /// The returned task is `Pending` until a worker picks the job up. A
    /// panic inside `f` faults the task.
    pub fn run<F, T>(&self, f: F) -> Task<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.task().run(f)
    }

    /// Runs the fallible `f` on a worker thread. An `Err` faults the task.
    pub fn try_run<F, T, E>(&self, f: F) -> Task<T>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        self.task().try_run(f)
    }

    /// Runs `f` with an explicit strategy.
    ///
    /// - [`Strategy::Background`]: same as [`run`](Handle::run).
    /// - [`Strategy::Custom`]: `f` runs inline on the calling thread and the
    ///   task comes back already resolved.
    /// - [`Strategy::Cooperative`]: rejected, cooperative tasks are built
    ///   from routines on a [`Scheduler`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CooperativeFunction`] for `Strategy::Cooperative`.
    pub fn run_with<F, T>(&self, strategy: Strategy, f: F) -> Result<Task<T>, Error>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.task().run_with(strategy, f)
    }

    /// Creates a scheduler driven by the calling thread.
    ///
    /// Its routines inherit this runtime's configuration and can start
    /// background tasks through the free functions of [`crate::task`].
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::with_runtime(self.clone())
    }

    /// Blocks the calling thread for at least `millis` milliseconds using
    /// the configured [`Sleeper`].
    pub fn delay(&self, millis: u64) {
        self.inner.sleeper.sleep(Duration::from_millis(millis));
    }

    /// Makes this runtime current on the calling thread while `f` runs.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        context::enter_runtime(self, f)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Builder<'_, Handle> {
    /// Runs `f` on a worker thread. See [`Handle::run`].
    pub fn run<F, T>(self, f: F) -> Task<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        self.try_run(move || Ok::<T, anyhow::Error>(f()))
    }

    /// Runs the fallible `f` on a worker thread. See [`Handle::try_run`].
    pub fn try_run<F, T, E>(self, f: F) -> Task<T>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        let shared = Arc::new(Shared::pending(Kind::Background, self.config, self.name));
        let handle = self.spawner.clone();

        let background = BackgroundJob::new(shared.clone(), move || f().map_err(Fault::new));
        let job: Job = Box::new(move || context::enter_runtime(&handle, || background.run()));

        if let Err(err) = self.spawner.inner.executor.execute(job) {
            tracing::debug!(task.id = %shared.id(), error = %err, "background job rejected");
        }

        Task::from_shared(shared)
    }

    /// Runs `f` with an explicit strategy. See [`Handle::run_with`].
    pub fn run_with<F, T>(self, strategy: Strategy, f: F) -> Result<Task<T>, Error>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        match strategy {
            Strategy::Background => Ok(self.run(f)),
            Strategy::Custom => Ok(self.run_inline(f)),
            Strategy::Cooperative => Err(Error::CooperativeFunction),
        }
    }

    fn run_inline<F, T>(self, f: F) -> Task<T>
    where
        F: FnOnce() -> T,
    {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Outcome::Success(value),
            Err(payload) => Outcome::Faulted(Fault::from_panic(payload)),
        };

        let shared = Shared::resolved(outcome, self.config, self.name);
        if let Some(Outcome::Faulted(fault)) = shared.outcome() {
            shared.report(fault);
        }

        Task::from_shared(Arc::new(shared))
    }
}
