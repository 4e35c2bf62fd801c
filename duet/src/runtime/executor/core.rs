use super::{Executor, Job};
use crate::error::Error;
use crate::runtime::context;
use crate::runtime::executor::worker::Worker;
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A fixed-size pool of worker threads with work stealing.
///
/// Jobs submitted from outside the pool go to a global injector; jobs
/// submitted from one of the pool's own workers go to that worker's local
/// queue. Idle workers steal from the injector and from each other.
///
/// Dropping the pool (or calling [`shutdown`](WorkerPool::shutdown) and
/// [`join`](WorkerPool::join)) stops the workers. Jobs still queued at that
/// point are dropped without running; task jobs fault when that happens.
pub struct WorkerPool {
    injector: Arc<Injector>,

    locals: Arc<Vec<Arc<LocalQueue>>>,

    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Starts a pool with `threads` workers named `duet-worker-{id}`.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0`.
    pub fn new(threads: usize) -> Result<Self, Error> {
        Self::with_thread_name(threads, "duet-worker")
    }

    /// Starts a pool with `threads` workers named `{prefix}-{id}`.
    ///
    /// # Panics
    ///
    /// Panics if `threads == 0`.
    pub fn with_thread_name(threads: usize, prefix: &str) -> Result<Self, Error> {
        assert!(threads > 0, "worker pool needs at least one thread");

        let injector = Arc::new(Injector::new());
        let locals: Arc<Vec<_>> = Arc::new((0..threads).map(|_| Arc::new(LocalQueue::new())).collect());

        let pool = Self {
            injector,
            locals,
            handles: Mutex::new(Vec::with_capacity(threads)),
        };

        for id in 0..threads {
            let worker = Arc::new(Worker::new(id, pool.locals.clone(), pool.injector.clone()));

            let spawned = thread::Builder::new()
                .name(format!("{prefix}-{id}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => pool.handles.lock().push(handle),
                // Dropping `pool` stops the workers already started.
                Err(err) => return Err(Error::Spawn(err)),
            }
        }

        tracing::debug!(threads, "worker pool started");

        Ok(pool)
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.locals.len()
    }

    /// Stops accepting jobs and wakes every worker so it can exit.
    pub fn shutdown(&self) {
        self.injector.shutdown();
    }

    /// Waits for all workers to exit, then drops the jobs left in the queues.
    ///
    /// Should be called after [`shutdown`](WorkerPool::shutdown). A worker
    /// calling this does not wait for itself.
    pub fn join(&self) {
        let current = thread::current().id();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();

        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }

        let mut leftover = self.injector.drain();
        for local in self.locals.iter() {
            leftover.extend(local.drain());
        }

        if !leftover.is_empty() {
            tracing::debug!(jobs = leftover.len(), "dropping jobs queued at shutdown");
        }
    }
}

impl Executor for WorkerPool {
    fn execute(&self, job: Job) -> Result<(), Error> {
        let pushed = match context::current_worker_of(&self.locals) {
            Some(worker) => self.injector.push_local(worker.local(), job),
            None => self.injector.push(job),
        };

        // A rejected job is dropped here; task jobs fault when that happens.
        pushed.map_err(|_| Error::PoolShutdown)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}
