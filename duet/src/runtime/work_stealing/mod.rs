//! Work-stealing queues of the worker pool.
//!
//! - [`injector`]: the global queue for jobs submitted from outside,
//! - [`queue`]: per-worker local queues, popped by their owner and
//!   stolen from by the others.

pub(crate) mod injector;
pub(crate) mod queue;
