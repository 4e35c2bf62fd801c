use super::state::{PENDING, RUNNING};
use super::{Outcome, Status, Strategy, TaskId};
use crate::config::TaskConfig;
use crate::error::{Error, Fault, TaskError};

use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll, Waker};
use std::thread::{self, ThreadId};

/// How a task came to be, with only the data each shape needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    /// Built from a value, or from a function run inline.
    ImmediateSuccess,

    /// Built from a failure, or from a function run inline that failed.
    ImmediateFailure,

    /// A function handed to a worker pool.
    Background,

    /// A routine registered with the scheduler owned by `driver`.
    Cooperative { driver: ThreadId },
}

impl Kind {
    pub(crate) fn strategy(self) -> Strategy {
        match self {
            Kind::ImmediateSuccess | Kind::ImmediateFailure => Strategy::Custom,
            Kind::Background => Strategy::Background,
            Kind::Cooperative { .. } => Strategy::Cooperative,
        }
    }
}

/// State shared between a task's producer and all of its observers.
///
/// The producer (a pool worker or the scheduler) is the only writer of
/// `state` and the only one that publishes a success or fault; `cancel`
/// competes for the same single publication slot.
pub(crate) struct Shared<T> {
    id: TaskId,

    name: Option<Arc<str>>,

    kind: Kind,

    /// `PENDING` or `RUNNING`; terminal states are read from `outcome`.
    state: AtomicU8,

    /// Written once. Reads observe either nothing or the full outcome.
    outcome: OnceLock<Outcome<T>>,

    config: TaskConfig,

    /// Continuations waiting for the outcome.
    waiters: Mutex<Vec<Waker>>,
}

impl<T> Shared<T> {
    pub(crate) fn pending(kind: Kind, config: TaskConfig, name: Option<Arc<str>>) -> Self {
        Self {
            id: TaskId::next(),
            name,
            kind,
            state: AtomicU8::new(PENDING),
            outcome: OnceLock::new(),
            config,
            waiters: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn resolved(outcome: Outcome<T>, config: TaskConfig, name: Option<Arc<str>>) -> Self {
        let kind = match outcome {
            Outcome::Faulted(_) => Kind::ImmediateFailure,
            _ => Kind::ImmediateSuccess,
        };

        Self {
            id: TaskId::next(),
            name,
            kind,
            state: AtomicU8::new(RUNNING),
            outcome: OnceLock::from(outcome),
            config,
            waiters: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn kind(&self) -> Kind {
        self.kind
    }

    pub(crate) fn outcome(&self) -> Option<&Outcome<T>> {
        self.outcome.get()
    }

    pub(crate) fn status(&self) -> Status {
        match self.outcome.get() {
            Some(outcome) => outcome.status(),
            None => Status::from_code(self.state.load(Ordering::Acquire)),
        }
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Moves the task from `Pending` to `Running`.
    ///
    /// Returns `false` if the task already started or already has an
    /// outcome, in which case the caller must not run the work.
    pub(crate) fn begin(&self) -> bool {
        if self.is_terminal() {
            return false;
        }

        let started = self
            .state
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if started {
            tracing::trace!(task.id = %self.id, "task running");
        }

        started
    }

    /// Publishes the terminal outcome and wakes every waiter.
    ///
    /// Only the first publication wins. A later one (typically a result that
    /// arrives after the task was cancelled) is dropped and `false` is
    /// returned. Faults that win are forwarded to the diagnostics sink
    /// before any waiter is woken.
    pub(crate) fn publish(&self, outcome: Outcome<T>) -> bool {
        let status = outcome.status();

        if self.outcome.set(outcome).is_err() {
            tracing::trace!(task.id = %self.id, %status, "outcome discarded, task already terminal");
            return false;
        }

        tracing::trace!(task.id = %self.id, %status, "task completed");

        // Reported before waking, so a woken waiter sees the report done.
        if let Some(fault) = self.outcome.get().and_then(Outcome::fault) {
            self.report(fault);
        }

        // Taking the lock after `set` pairs with the re-check in
        // `poll_terminal`, so no waiter can miss this wake-up.
        let waiters = mem::take(&mut *self.waiters.lock());
        for waker in waiters {
            waker.wake();
        }

        true
    }

    pub(crate) fn report(&self, fault: &Fault) {
        self.config.report(self.id, self.name(), fault);
    }

    /// Publishes `Cancelled` unless the task already has an outcome.
    pub(crate) fn cancel(&self) -> bool {
        self.publish(Outcome::Cancelled)
    }

    /// Resolves once the task is terminal, registering `cx`'s waker otherwise.
    ///
    /// The waker is registered before the state is checked again, so a
    /// concurrent publication is never missed.
    pub(crate) fn poll_terminal(&self, cx: &mut Context<'_>) -> Poll<Status> {
        if let Some(outcome) = self.outcome.get() {
            return Poll::Ready(outcome.status());
        }

        let mut waiters = self.waiters.lock();

        if let Some(outcome) = self.outcome.get() {
            return Poll::Ready(outcome.status());
        }

        if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
            waiters.push(cx.waker().clone());
        }

        Poll::Pending
    }

    /// Fails fast when blocking here could never return.
    pub(crate) fn check_blocking_wait(&self) -> Result<(), Error> {
        if let Kind::Cooperative { driver } = self.kind {
            if driver == thread::current().id() && !self.is_terminal() {
                return Err(Error::WaitOnDriver(self.id));
            }
        }

        Ok(())
    }

    /// Runs `work` as this task's single execution.
    ///
    /// Panics and errors raised by `work` are captured into the outcome;
    /// nothing escapes to the calling thread. Calling this on a task that
    /// already started is a no-op.
    pub(crate) fn execute<F>(&self, work: F)
    where
        F: FnOnce() -> Result<T, Fault>,
    {
        if !self.begin() {
            return;
        }

        let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(Ok(value)) => Outcome::Success(value),
            Ok(Err(fault)) => Outcome::Faulted(fault),
            Err(payload) => Outcome::Faulted(Fault::from_panic(payload)),
        };

        self.publish(outcome);
    }
}

/// The function of a background task, packaged for a worker pool.
///
/// If the job is dropped without running (the pool shut down with it still
/// queued, or an executor rejected it) the task faults instead of staying
/// `Pending` forever.
pub(crate) struct BackgroundJob<T, F> {
    shared: Arc<Shared<T>>,
    work: Option<F>,
}

impl<T, F> BackgroundJob<T, F>
where
    F: FnOnce() -> Result<T, Fault>,
{
    pub(crate) fn new(shared: Arc<Shared<T>>, work: F) -> Self {
        Self {
            shared,
            work: Some(work),
        }
    }

    pub(crate) fn run(mut self) {
        if let Some(work) = self.work.take() {
            self.shared.execute(work);
        }
    }
}

impl<T, F> Drop for BackgroundJob<T, F> {
    fn drop(&mut self) {
        if self.work.is_some() {
            self.shared.publish(Outcome::Faulted(Fault::new(Error::JobDropped)));
        }
    }
}

/// A handle to work that may run in the background, run cooperatively on a
/// scheduler, or already be resolved.
///
/// All three kinds expose the same observation surface: [`status`],
/// [`result`], [`fault`], blocking [`wait`], the [`completion`] future and
/// the [`wait_routine`] step-source.
///
/// Handles are cheap to clone; every clone observes the same task.
/// Dropping a handle never cancels or interrupts the work.
///
/// [`status`]: Task::status
/// [`result`]: Task::result
/// [`fault`]: Task::fault
/// [`wait`]: Task::wait
/// [`completion`]: Task::completion
/// [`wait_routine`]: Task::wait_routine
pub struct Task<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Task<T> {
    pub(crate) fn from_shared(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// A task that is already `Success` with `value`.
    ///
    /// It never touches a worker pool or a scheduler.
    pub fn from_value(value: T) -> Self {
        Self::from_shared(Arc::new(Shared::resolved(
            Outcome::Success(value),
            TaskConfig::default(),
            None,
        )))
    }

    /// A task that is already `Faulted` with `fault`.
    ///
    /// Pre-existing failures are not reported to the diagnostics sink: they
    /// were not raised by the task's own execution.
    pub fn from_fault(fault: Fault) -> Self {
        Self::from_shared(Arc::new(Shared::resolved(
            Outcome::Faulted(fault),
            TaskConfig::default(),
            None,
        )))
    }

    /// A task that is already `Faulted` with `error`.
    pub fn from_error<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::from_fault(Fault::new(error))
    }

    /// Unique id of this task.
    pub fn id(&self) -> TaskId {
        self.shared.id()
    }

    /// Name given at construction, if any.
    pub fn name(&self) -> Option<&str> {
        self.shared.name()
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// How the task's work is executed.
    pub fn strategy(&self) -> Strategy {
        self.shared.kind().strategy()
    }

    /// Returns `true` once the task is `Success`, `Faulted` or `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        self.shared.is_terminal()
    }

    /// The result, present only when the task is `Success`.
    pub fn result(&self) -> Option<&T> {
        match self.shared.outcome() {
            Some(Outcome::Success(value)) => Some(value),
            _ => None,
        }
    }

    /// The captured failure, present only when the task is `Faulted`.
    pub fn fault(&self) -> Option<&Fault> {
        self.shared.outcome().and_then(Outcome::fault)
    }

    /// The published terminal outcome, if any.
    pub fn outcome(&self) -> Option<&Outcome<T>> {
        self.shared.outcome()
    }

    /// Borrows the result, or returns why there is none.
    ///
    /// This is how a failure is re-surfaced to a caller: faults are never
    /// raised on their own.
    pub fn get(&self) -> Result<&T, TaskError> {
        match self.shared.outcome() {
            Some(outcome) => outcome.as_result(),
            None => Err(TaskError::NotCompleted(self.status())),
        }
    }

    /// Abandons observation of the task.
    ///
    /// Publishes `Cancelled` if the task is not terminal yet and wakes all
    /// waiters. Work already in flight is not interrupted; its eventual
    /// result is discarded. A cancelled cooperative task is not advanced
    /// again. Returns `false` if the task was already terminal.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("strategy", &self.strategy())
            .field("status", &self.status())
            .finish()
    }
}
