use crate::runtime::executor::Job;

use parking_lot::Mutex;
use std::collections::VecDeque;

/// A per-worker local job queue.
///
/// The owning worker pushes and pops at the back (LIFO), which keeps a job
/// submitted from inside another job close to the data it was produced
/// from. Other workers steal from the front (FIFO).
pub(crate) struct LocalQueue {
    inner: Mutex<VecDeque<Job>>,
}

impl LocalQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, job: Job) {
        self.inner.lock().push_back(job);
    }

    pub(crate) fn pop(&self) -> Option<Job> {
        self.inner.lock().pop_back()
    }

    pub(crate) fn steal(&self) -> Option<Job> {
        self.inner.lock().pop_front()
    }

    /// Removes every queued job.
    pub(crate) fn drain(&self) -> Vec<Job> {
        self.inner.lock().drain(..).collect()
    }
}
