use crate::runtime::executor::Job;
use crate::runtime::work_stealing::queue::LocalQueue;

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Upper bound on how long an idle worker sleeps before looking for work
/// to steal again. Local queues do not signal the condvar on every push.
const PARK_TIMEOUT: Duration = Duration::from_millis(1);

/// Global job queue of the worker pool.
///
/// Jobs submitted from outside the pool land here. The injector also
/// parks idle workers and wakes them when work arrives.
///
/// The shutdown flag only changes under the queue lock, and every push
/// (local ones included) checks it under that same lock. Once
/// [`shutdown`](Injector::shutdown) returns, no job can be queued anymore,
/// so draining the queues afterwards sees every accepted job.
pub(crate) struct Injector {
    queue: Mutex<VecDeque<Job>>,

    condvar: Condvar,

    shutdown: AtomicBool,
}

impl Injector {
    pub(crate) fn new() -> Self {
        Injector {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Signals shutdown and wakes all parked workers.
    pub(crate) fn shutdown(&self) {
        let queue = self.queue.lock();
        self.shutdown.store(true, Ordering::Release);
        drop(queue);

        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Queues `job`, or hands it back if shutdown was signalled.
    pub(crate) fn push(&self, job: Job) -> Result<(), Job> {
        let mut queue = self.queue.lock();
        if self.is_shutdown() {
            return Err(job);
        }
        queue.push_back(job);
        drop(queue);

        self.condvar.notify_one();
        Ok(())
    }

    /// Queues `job` on a worker's local queue, or hands it back if shutdown
    /// was signalled.
    ///
    /// Lock order is injector first, then the local queue.
    pub(crate) fn push_local(&self, local: &LocalQueue, job: Job) -> Result<(), Job> {
        let queue = self.queue.lock();
        if self.is_shutdown() {
            return Err(job);
        }
        local.push(job);
        drop(queue);

        self.condvar.notify_one();
        Ok(())
    }

    /// Parks the calling worker until work arrives, shutdown is signalled,
    /// or [`PARK_TIMEOUT`] elapses.
    pub(crate) fn park(&self) {
        let mut queue = self.queue.lock();

        if self.is_shutdown() || !queue.is_empty() {
            return;
        }

        self.condvar.wait_for(&mut queue, PARK_TIMEOUT);
    }

    pub(crate) fn steal(&self) -> Option<Job> {
        self.queue.lock().pop_front()
    }

    /// Removes every queued job.
    pub(crate) fn drain(&self) -> Vec<Job> {
        self.queue.lock().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn counting_job(counter: &Arc<AtomicUsize>) -> Job {
        let counter = counter.clone();
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_push_after_shutdown_is_rejected() {
        let injector = Injector::new();
        let local = LocalQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        assert!(injector.push(counting_job(&counter)).is_ok());
        injector.shutdown();

        let rejected = injector.push(counting_job(&counter)).unwrap_err();
        rejected();
        assert!(injector.push_local(&local, counting_job(&counter)).is_err());

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(injector.drain().len(), 1);
        assert!(local.drain().is_empty());
    }

    #[test]
    fn test_push_local_lands_in_the_local_queue() {
        let injector = Injector::new();
        let local = LocalQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        assert!(injector.push_local(&local, counting_job(&counter)).is_ok());

        assert!(injector.steal().is_none());
        let job = local.pop().unwrap();
        job();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
