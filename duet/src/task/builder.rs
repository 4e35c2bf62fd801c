use crate::config::{FaultSink, TaskConfig};

use std::sync::Arc;

/// Configures a task before it is created.
///
/// Obtained from [`Handle::task`](crate::Handle::task) for background and
/// custom tasks, or [`SchedulerHandle::task`](crate::SchedulerHandle::task)
/// for cooperative ones. Settings start from the runtime's or scheduler's
/// [`TaskConfig`] and only affect the task being built.
///
/// # Examples
///
/// ```rust,ignore
/// let task = runtime
///     .task()
///     .name("load-chunk")
///     .log_errors(false)
///     .try_run(|| load_chunk(4, 2));
/// ```
pub struct Builder<'a, S> {
    pub(crate) spawner: &'a S,
    pub(crate) config: TaskConfig,
    pub(crate) name: Option<Arc<str>>,
}

impl<'a, S> Builder<'a, S> {
    pub(crate) fn new(spawner: &'a S, config: TaskConfig) -> Self {
        Self {
            spawner,
            config,
            name: None,
        }
    }

    /// Names the task. The name shows up in fault reports and `Debug` output.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(Arc::from(name));
        self
    }

    /// Overrides whether this task's failures are reported.
    pub fn log_errors(mut self, enabled: bool) -> Self {
        self.config = self.config.log_errors(enabled);
        self
    }

    /// Overrides where this task's failures are reported.
    pub fn sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.config = self.config.sink(sink);
        self
    }
}
