use crate::runtime::context;
use crate::runtime::executor::Job;
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A worker thread of the pool.
///
/// The lookup order for the next job is:
/// 1. Pop from the local queue
/// 2. Steal from the global injector
/// 3. Steal from other workers
/// 4. Park if no work is available
pub(crate) struct Worker {
    id: usize,

    /// All local queues (one per worker).
    locals: Arc<Vec<Arc<LocalQueue>>>,

    injector: Arc<Injector>,
}

impl Worker {
    pub(crate) fn new(id: usize, locals: Arc<Vec<Arc<LocalQueue>>>, injector: Arc<Injector>) -> Self {
        Self {
            id,
            locals,
            injector,
        }
    }

    /// Returns `true` if this worker belongs to the pool owning `locals`.
    pub(crate) fn belongs_to(&self, locals: &Arc<Vec<Arc<LocalQueue>>>) -> bool {
        Arc::ptr_eq(&self.locals, locals)
    }

    pub(crate) fn local(&self) -> &LocalQueue {
        &self.locals[self.id]
    }

    /// Runs jobs until the injector signals shutdown.
    pub(crate) fn run(self: Arc<Self>) {
        context::set_worker(Some(self.clone()));

        tracing::debug!(worker = self.id, "worker started");

        while !self.injector.is_shutdown() {
            match self.next_job() {
                Some(job) => self.execute(job),
                None => self.injector.park(),
            }
        }

        context::set_worker(None);

        tracing::debug!(worker = self.id, "worker stopped");
    }

    /// Runs one queued job, if there is any.
    ///
    /// Called by a job blocked in a wait on this worker, so the jobs it
    /// waits for still make progress when every worker is blocked.
    pub(crate) fn run_next(&self) -> bool {
        match self.next_job() {
            Some(job) => {
                self.execute(job);
                true
            }
            None => false,
        }
    }

    fn next_job(&self) -> Option<Job> {
        self.local()
            .pop()
            .or_else(|| self.injector.steal())
            .or_else(|| self.try_steal())
    }

    /// Runs one job, keeping the worker alive if it panics.
    ///
    /// Task jobs capture their own panics; this only catches raw jobs
    /// handed to the pool through [`Executor`](crate::Executor).
    fn execute(&self, job: Job) {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!(worker = self.id, "background job panicked");
        }
    }

    /// Steals from the other workers, round-robin starting after this one.
    fn try_steal(&self) -> Option<Job> {
        let len = self.locals.len();

        if len <= 1 {
            return None;
        }

        (1..len)
            .map(|i| (self.id + i) % len)
            .find_map(|victim| self.locals[victim].steal())
    }
}
