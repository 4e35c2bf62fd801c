//! # Duet
//!
//! **Duet** gives background work and cooperative work one face.
//!
//! A [`Task`] is a handle to a unit of work that either:
//!
//! - runs a function on a worker thread of a [`Runtime`] (`Background`),
//! - is advanced one step per tick by a [`Scheduler`] on the thread that
//!   owns it (`Cooperative`), or
//! - was already resolved when it was built (`Custom`).
//!
//! Whatever the strategy, the task is observed the same way: poll its
//! [`Status`], read its result or captured [`Fault`], block until it is
//! terminal, or wait for it from cooperative code through
//! [`Task::completion`] and [`Task::wait_routine`].
//!
//! Failures raised by a task's work are captured into the task and, unless
//! disabled, reported once to a diagnostics sink (a `tracing` error event by
//! default). They are never thrown at the code that scheduled the work.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use duet::{RuntimeBuilder, Status, routine::yield_now};
//!
//! let runtime = RuntimeBuilder::new().worker_threads(2).build()?;
//! let mut scheduler = runtime.scheduler();
//!
//! let answer = runtime.run(|| 21 * 2);
//!
//! let report = scheduler.spawn_future({
//!     let answer = answer.clone();
//!     async move {
//!         answer.completion().await;
//!         yield_now().await;
//!         format!("answer is {:?}", answer.result())
//!     }
//! });
//!
//! // Once per frame:
//! while !report.is_terminal() {
//!     scheduler.tick();
//! }
//!
//! assert_eq!(report.status(), Status::Success);
//! ```
//!
//! ## Modules
//!
//! - [`task`]: task handles, status, outcomes and task sets
//! - [`scheduler`]: the cooperative driver
//! - [`routine`]: step-sources for cooperative tasks
//! - [`config`]: fault reporting
//! - [`time`]: delays, sleeps and timeouts
//! - [`error`]: error types

mod runtime;

pub mod config;
pub mod error;
pub mod routine;
pub mod scheduler;
pub mod task;
pub mod time;

pub use config::{FaultSink, TaskConfig, TracingSink};
pub use error::{Error, Fault, Panicked, TaskError};
pub use routine::{Routine, Step};
pub use runtime::{Executor, Handle, Job, Runtime, RuntimeBuilder, WorkerPool};
pub use scheduler::{Scheduler, SchedulerHandle, Tick};
pub use task::{AnyTask, Outcome, Status, Strategy, Task, TaskId, TaskSet};
