use super::Handle;
use crate::error::Error;
use crate::runtime::executor::worker::Worker;
use crate::runtime::work_stealing::queue::LocalQueue;
use crate::scheduler::SchedulerHandle;

use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    /// Runtime used by the free functions of [`crate::task`].
    static CURRENT_RUNTIME: RefCell<Option<Handle>> = const { RefCell::new(None) };

    /// Scheduler currently ticking on this thread.
    static CURRENT_SCHEDULER: RefCell<Option<SchedulerHandle>> = const { RefCell::new(None) };

    /// Set on pool worker threads for the lifetime of the worker loop.
    static CURRENT_WORKER: RefCell<Option<Arc<Worker>>> = const { RefCell::new(None) };
}

/// Restores the previous runtime when dropped.
struct RuntimeGuard(Option<Handle>);

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        let prev = self.0.take();
        let _ = CURRENT_RUNTIME.try_with(|cell| cell.replace(prev));
    }
}

/// Restores the previous scheduler when dropped.
struct SchedulerGuard(Option<SchedulerHandle>);

impl Drop for SchedulerGuard {
    fn drop(&mut self) {
        let prev = self.0.take();
        let _ = CURRENT_SCHEDULER.try_with(|cell| cell.replace(prev));
    }
}

/// Installs `handle` as the current runtime for the duration of `f`.
///
/// The previous runtime is restored afterwards, even if `f` panics.
pub(crate) fn enter_runtime<R>(handle: &Handle, f: impl FnOnce() -> R) -> R {
    let _guard = RuntimeGuard(CURRENT_RUNTIME.with(|cell| cell.replace(Some(handle.clone()))));
    f()
}

/// Installs `scheduler` as the current scheduler for the duration of `f`.
pub(crate) fn enter_scheduler<R>(scheduler: &SchedulerHandle, f: impl FnOnce() -> R) -> R {
    let _guard = SchedulerGuard(CURRENT_SCHEDULER.with(|cell| cell.replace(Some(scheduler.clone()))));
    f()
}

pub(crate) fn current_runtime() -> Result<Handle, Error> {
    CURRENT_RUNTIME
        .with(|cell| cell.borrow().clone())
        .ok_or(Error::NoRuntime)
}

pub(crate) fn current_scheduler() -> Result<SchedulerHandle, Error> {
    CURRENT_SCHEDULER
        .with(|cell| cell.borrow().clone())
        .ok_or(Error::NoScheduler)
}

pub(crate) fn set_worker(worker: Option<Arc<Worker>>) {
    CURRENT_WORKER.with(|cell| *cell.borrow_mut() = worker);
}

/// Returns the pool worker running on this thread, if any.
pub(crate) fn current_worker() -> Option<Arc<Worker>> {
    CURRENT_WORKER
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

/// Returns this thread's worker if it belongs to the pool owning `locals`.
pub(crate) fn current_worker_of(locals: &Arc<Vec<Arc<LocalQueue>>>) -> Option<Arc<Worker>> {
    current_worker().filter(|worker| worker.belongs_to(locals))
}
