use super::{Status, Strategy, Task, TaskId};
use crate::error::{Error, Fault};
use crate::runtime::park;

use std::future::poll_fn;
use std::task::{Context, Poll};

/// An untyped view of a task.
///
/// `AnyTask` exposes everything about a [`Task`] except its result, which
/// lets tasks with different result types be observed together.
pub trait AnyTask: Send + Sync {
    /// Unique id of the task.
    fn id(&self) -> TaskId;

    /// Current status.
    fn status(&self) -> Status;

    /// How the task's work is executed.
    fn strategy(&self) -> Strategy;

    /// The captured failure, present only when the task is `Faulted`.
    fn fault(&self) -> Option<&Fault>;

    /// Abandons observation of the task. See [`Task::cancel`].
    fn cancel(&self) -> bool;

    /// Blocks until the task is terminal. See [`Task::wait`].
    fn wait(&self) -> Result<Status, Error>;

    /// Resolves once the task is terminal, registering the waker otherwise.
    fn poll_terminal(&self, cx: &mut Context<'_>) -> Poll<Status>;

    /// Fails if blocking on this task from the current thread would deadlock.
    fn check_blocking_wait(&self) -> Result<(), Error>;
}

impl<T> AnyTask for Task<T>
where
    T: Send + Sync,
{
    fn id(&self) -> TaskId {
        Task::id(self)
    }

    fn status(&self) -> Status {
        Task::status(self)
    }

    fn strategy(&self) -> Strategy {
        Task::strategy(self)
    }

    fn fault(&self) -> Option<&Fault> {
        Task::fault(self)
    }

    fn cancel(&self) -> bool {
        Task::cancel(self)
    }

    fn wait(&self) -> Result<Status, Error> {
        Task::wait(self)
    }

    fn poll_terminal(&self, cx: &mut Context<'_>) -> Poll<Status> {
        self.shared.poll_terminal(cx)
    }

    fn check_blocking_wait(&self) -> Result<(), Error> {
        self.shared.check_blocking_wait()
    }
}

/// A collection of tasks observed as a group.
///
/// Tasks of any result type and any strategy can be mixed. Useful for:
/// - waiting for whichever of several tasks finishes first,
/// - waiting for a whole batch,
/// - abandoning a batch at once.
///
/// Dropping the set cancels every task still in it.
pub struct TaskSet {
    tasks: Vec<Box<dyn AnyTask>>,
}

impl TaskSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Adds a task to the set.
    pub fn insert<T>(&mut self, task: Task<T>)
    where
        T: Send + Sync + 'static,
    {
        self.tasks.push(Box::new(task));
    }

    /// Number of tasks that have not been taken out of the set yet.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the set holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates over the tasks in the set.
    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyTask> {
        self.tasks.iter().map(|task| task.as_ref())
    }

    /// Waits for the next task to become terminal and removes it.
    ///
    /// Returns `None` if the set is empty.
    pub async fn join_next(&mut self) -> Option<(TaskId, Status)> {
        if self.tasks.is_empty() {
            return None;
        }

        poll_fn(|cx| {
            for i in 0..self.tasks.len() {
                if let Poll::Ready(status) = self.tasks[i].poll_terminal(cx) {
                    // Order is not preserved.
                    let task = self.tasks.swap_remove(i);
                    return Poll::Ready(Some((task.id(), status)));
                }
            }

            Poll::Pending
        })
        .await
    }

    /// Blocks until one task is terminal, removes it and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitOnDriver`] if the set holds an unfinished
    /// cooperative task driven by the calling thread.
    pub fn wait_any(&mut self) -> Result<Option<(TaskId, Status)>, Error> {
        self.check_blocking_wait()?;

        Ok(park::block_on(self.join_next(), None).flatten())
    }

    /// Blocks until every task is terminal, emptying the set.
    ///
    /// Returns the tasks in the order they finished.
    ///
    /// # Errors
    ///
    /// Same as [`wait_any`](TaskSet::wait_any).
    pub fn wait_all(&mut self) -> Result<Vec<(TaskId, Status)>, Error> {
        self.check_blocking_wait()?;

        let mut finished = Vec::with_capacity(self.tasks.len());
        while let Some(entry) = park::block_on(self.join_next(), None).flatten() {
            finished.push(entry);
        }

        Ok(finished)
    }

    /// Cancels every task in the set and empties it.
    pub fn cancel_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.cancel();
        }
    }

    fn check_blocking_wait(&self) -> Result<(), Error> {
        self.tasks.iter().try_for_each(|task| task.check_blocking_wait())
    }
}

impl Default for TaskSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskSet {
    /// Cancels the tasks still in the set.
    fn drop(&mut self) {
        self.cancel_all();
    }
}
