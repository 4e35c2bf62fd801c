//! Runtime components.
//!
//! - [`Runtime`] and [`RuntimeBuilder`]: configuration and lifecycle,
//! - [`Handle`]: the cloneable entry point for creating tasks,
//! - [`Executor`] and [`WorkerPool`]: background execution with work stealing,
//! - thread-local context used by the free functions of [`crate::task`].

mod builder;
mod core;
mod executor;
mod work_stealing;

pub(crate) mod context;
pub(crate) mod park;

pub use self::builder::RuntimeBuilder;
pub use self::core::{Handle, Runtime};
pub use self::executor::{Executor, Job, WorkerPool};
