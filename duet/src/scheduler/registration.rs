use crate::error::{Error, Fault};
use crate::routine::{Routine, Step};
use crate::task::{Outcome, Shared, Status, TaskId};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// What happened when a registration was advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Progress {
    /// The routine yielded; keep the registration.
    Yielded,

    /// The routine finished on this step with the given terminal status.
    Finished(Status),

    /// The task was already terminal (cancelled); it was not advanced.
    Abandoned,
}

/// A scheduler's type-erased view of a cooperative task.
pub(crate) trait Advance: Send {
    fn id(&self) -> TaskId;

    /// Advances the routine by one step, publishing the outcome on its last.
    fn advance(&mut self) -> Progress;

    /// Faults the task because it will never be advanced again.
    fn close(&mut self);
}

/// A routine and the task it completes.
pub(crate) struct Registration<R>
where
    R: Routine,
{
    shared: Arc<Shared<R::Output>>,
    routine: R,
}

impl<R> Registration<R>
where
    R: Routine,
{
    pub(crate) fn new(shared: Arc<Shared<R::Output>>, routine: R) -> Self {
        Self { shared, routine }
    }
}

impl<R> Advance for Registration<R>
where
    R: Routine,
    R::Output: Send + Sync,
{
    fn id(&self) -> TaskId {
        self.shared.id()
    }

    fn advance(&mut self) -> Progress {
        if self.shared.is_terminal() {
            return Progress::Abandoned;
        }

        self.shared.begin();

        let step = panic::catch_unwind(AssertUnwindSafe(|| self.routine.step()));

        let outcome = match step {
            Ok(Ok(Step::Yield)) => return Progress::Yielded,
            Ok(Ok(Step::Done(value))) => Outcome::Success(value),
            Ok(Err(err)) => Outcome::Faulted(Fault::new(err)),
            Err(payload) => Outcome::Faulted(Fault::from_panic(payload)),
        };

        self.shared.publish(outcome);

        Progress::Finished(self.shared.status())
    }

    fn close(&mut self) {
        self.shared.publish(Outcome::Faulted(Fault::new(Error::SchedulerClosed)));
    }
}
