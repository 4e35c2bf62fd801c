//! The cooperative driver.
//!
//! A [`Scheduler`] owns the routines of cooperative tasks and advances each
//! of them one step per [`tick`](Scheduler::tick). It belongs to the thread
//! that created it: that thread is the only one that ticks it, and the only
//! one for which a blocking wait on one of its tasks is refused.
//!
//! Other threads register routines through a [`SchedulerHandle`]. New
//! registrations are picked up at the start of the next tick, after the
//! ones already live, so routines are always advanced in registration order.
//!
//! ```rust,ignore
//! let mut scheduler = Scheduler::new();
//! let task = scheduler.spawn_future(async {
//!     yield_now().await;
//!     "done"
//! });
//!
//! // Once per frame:
//! scheduler.tick();
//! ```

mod inbox;
mod registration;

use self::inbox::Inbox;
use self::registration::{Advance, Progress, Registration};
use crate::config::TaskConfig;
use crate::routine::{self, Routine};
use crate::runtime::{Handle, context};
use crate::task::{Builder, Kind, Shared, Status, Task};

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;
use std::thread;

/// Counters describing one [`Scheduler::tick`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct Tick {
    /// Registrations picked up from the inbox at the start of the tick.
    pub registered: usize,

    /// Routines advanced by one step.
    ///
    /// Always `>= completed + faulted`.
    pub advanced: usize,

    /// Routines that finished with `Success` on this tick.
    pub completed: usize,

    /// Routines that failed on this tick.
    pub faulted: usize,

    /// Registrations dropped without being advanced because their task was
    /// cancelled.
    ///
    /// Never overlaps `advanced`: a routine whose task is cancelled during
    /// its own step counts as advanced only.
    pub dropped: usize,

    /// Registrations still live or queued after the tick.
    pub remaining: usize,
}

/// Advances cooperative tasks, one step per tick.
///
/// `Scheduler` is neither `Send` nor `Sync`, and `tick` takes `&mut self`:
/// a routine can never be advanced concurrently with itself or with the
/// scheduler's own bookkeeping.
///
/// Dropping the scheduler faults every task it still holds with
/// [`Error::SchedulerClosed`](crate::Error::SchedulerClosed), and so do
/// later registrations through a [`SchedulerHandle`].
pub struct Scheduler {
    handle: SchedulerHandle,

    /// Live registrations, in registration order.
    live: Vec<Box<dyn Advance>>,

    /// Installed as the current runtime while ticking.
    runtime: Option<Handle>,

    /// Pins the scheduler to its driver thread.
    _driver: PhantomData<*const ()>,
}

impl Scheduler {
    /// Creates a scheduler driven by the calling thread.
    pub fn new() -> Self {
        Self::with_config(TaskConfig::default())
    }

    /// Creates a scheduler whose tasks use `config`.
    pub fn with_config(config: TaskConfig) -> Self {
        Self::build(config, None)
    }

    pub(crate) fn with_runtime(runtime: Handle) -> Self {
        Self::build(runtime.config().clone(), Some(runtime))
    }

    fn build(config: TaskConfig, runtime: Option<Handle>) -> Self {
        Self {
            handle: SchedulerHandle {
                inbox: Arc::new(Inbox::new(thread::current().id())),
                config,
            },
            live: Vec::new(),
            runtime,
            _driver: PhantomData,
        }
    }

    /// A handle for registering routines from any thread.
    pub fn handle(&self) -> &SchedulerHandle {
        &self.handle
    }

    /// Starts configuring a cooperative task.
    pub fn task(&self) -> Builder<'_, SchedulerHandle> {
        self.handle.task()
    }

    /// Registers `routine` as a cooperative task.
    pub fn spawn<R>(&self, routine: R) -> Task<R::Output>
    where
        R: Routine + 'static,
        R::Output: Send + Sync + 'static,
    {
        self.handle.spawn(routine)
    }

    /// Registers `future` as a cooperative task polled once per tick.
    pub fn spawn_future<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + Sync + 'static,
    {
        self.handle.spawn_future(future)
    }

    /// Number of registrations, live or waiting for the next tick.
    pub fn len(&self) -> usize {
        self.live.len() + self.handle.inbox.len()
    }

    /// Returns `true` if no routine is registered.
    pub fn is_idle(&self) -> bool {
        self.len() == 0
    }

    /// Advances every live routine by exactly one step.
    ///
    /// Pending registrations are picked up first. Routines run in
    /// registration order; a routine that finishes, fails or was cancelled
    /// is deregistered on this tick. Routines registered during the tick
    /// are first advanced on the next one.
    pub fn tick(&mut self) -> Tick {
        let mut tick = Tick {
            registered: self.handle.inbox.drain_into(&mut self.live),
            ..Tick::default()
        };

        let live = &mut self.live;
        let counters = &mut tick;

        context::enter_scheduler(&self.handle, || match &self.runtime {
            Some(runtime) => context::enter_runtime(runtime, || advance_live(live, counters)),
            None => advance_live(live, counters),
        });

        tick.remaining = self.len();

        tracing::debug!(
            tick.registered,
            tick.advanced,
            tick.completed,
            tick.faulted,
            tick.dropped,
            tick.remaining
        );

        tick
    }

    /// Ticks until no routine is registered and returns the number of ticks.
    ///
    /// Never returns if a routine never finishes.
    pub fn run_until_idle(&mut self) -> usize {
        let mut ticks = 0;

        while !self.is_idle() {
            self.tick();
            ticks += 1;
        }

        ticks
    }

    /// Ticks until `task` is terminal and returns the number of ticks.
    ///
    /// `task` does not need to belong to this scheduler: driving the
    /// scheduler while a background task finishes is allowed.
    pub fn run_until<T>(&mut self, task: &Task<T>) -> usize {
        let mut ticks = 0;

        while !task.is_terminal() {
            let tick = self.tick();
            ticks += 1;

            if tick.advanced == 0 {
                thread::yield_now();
            }
        }

        ticks
    }
}

/// Advances each registration once, dropping the ones that are done.
fn advance_live(live: &mut Vec<Box<dyn Advance>>, tick: &mut Tick) {
    live.retain_mut(|entry| match entry.advance() {
        Progress::Yielded => {
            tick.advanced += 1;
            true
        }
        Progress::Finished(status) => {
            tick.advanced += 1;
            // A routine cancelled while stepping still counts as advanced.
            match status {
                Status::Success => tick.completed += 1,
                Status::Faulted => tick.faulted += 1,
                _ => {}
            }
            tracing::trace!(task.id = %entry.id(), %status, "routine finished");
            false
        }
        Progress::Abandoned => {
            tick.dropped += 1;
            false
        }
    });
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let mut orphans = mem::take(&mut self.live);
        orphans.extend(self.handle.inbox.close());

        if !orphans.is_empty() {
            tracing::debug!(tasks = orphans.len(), "scheduler dropped with live routines");
        }

        for entry in &mut orphans {
            entry.close();
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("live", &self.live.len())
            .field("queued", &self.handle.inbox.len())
            .finish_non_exhaustive()
    }
}

/// Registers routines with a [`Scheduler`] from any thread.
#[derive(Clone)]
pub struct SchedulerHandle {
    inbox: Arc<Inbox>,

    config: TaskConfig,
}

impl SchedulerHandle {
    /// Starts configuring a cooperative task.
    pub fn task(&self) -> Builder<'_, SchedulerHandle> {
        Builder::new(self, self.config.clone())
    }

    /// Registers `routine` as a cooperative task.
    pub fn spawn<R>(&self, routine: R) -> Task<R::Output>
    where
        R: Routine + 'static,
        R::Output: Send + Sync + 'static,
    {
        self.task().spawn(routine)
    }

    /// Registers `future` as a cooperative task polled once per tick.
    pub fn spawn_future<F>(&self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + Sync + 'static,
    {
        self.task().spawn_future(future)
    }

    /// The thread that drives the scheduler.
    pub fn driver(&self) -> thread::ThreadId {
        self.inbox.driver()
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("driver", &self.inbox.driver())
            .finish_non_exhaustive()
    }
}

impl Builder<'_, SchedulerHandle> {
    /// Registers `routine` as a cooperative task.
    pub fn spawn<R>(self, routine: R) -> Task<R::Output>
    where
        R: Routine + 'static,
        R::Output: Send + Sync + 'static,
    {
        let kind = Kind::Cooperative {
            driver: self.spawner.inbox.driver(),
        };
        let shared = Arc::new(Shared::pending(kind, self.config, self.name));

        let registration = Box::new(Registration::new(shared.clone(), routine));
        if let Err(mut rejected) = self.spawner.inbox.push(registration) {
            rejected.close();
        }

        Task::from_shared(shared)
    }

    /// Registers `future` as a cooperative task polled once per tick.
    pub fn spawn_future<F>(self, future: F) -> Task<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + Sync + 'static,
    {
        self.spawn(routine::from_future(future))
    }

    /// Registers a fallible `future`; an `Err` output faults the task.
    pub fn try_spawn_future<F, T, E>(self, future: F) -> Task<T>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        self.spawn(routine::try_from_future(future))
    }
}
