//! Background execution.
//!
//! The runtime only needs one capability from a thread pool: run a job, once,
//! somewhere off the calling thread. That capability is the [`Executor`]
//! trait. [`WorkerPool`] is the built-in implementation:
//! - [`core`]: pool lifecycle, submission and shutdown,
//! - [`worker`]: the worker loop with work stealing.

pub(crate) mod core;
pub(crate) mod worker;

use crate::error::Error;

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs asynchronously, each exactly once.
///
/// No ordering is guaranteed between jobs. An implementation may reject a
/// job by returning an error; the job is then dropped without running.
pub trait Executor: Send + Sync {
    /// Submits `job` for execution.
    fn execute(&self, job: Job) -> Result<(), Error>;
}

pub use self::core::WorkerPool;
