use super::Status;
use crate::error::{Fault, TaskError};

/// The terminal value of a task.
///
/// An outcome is published exactly once. Everything an observer can learn
/// about a finished task (its status, its result, its failure) is read from
/// this single value, so a reader can never see `Success` without the
/// result or `Faulted` without the failure.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The work completed and produced a value.
    Success(T),

    /// The work failed.
    Faulted(Fault),

    /// Observation was abandoned before the work completed.
    Cancelled,
}

impl<T> Outcome<T> {
    /// The terminal status this outcome corresponds to.
    pub fn status(&self) -> Status {
        match self {
            Outcome::Success(_) => Status::Success,
            Outcome::Faulted(_) => Status::Faulted,
            Outcome::Cancelled => Status::Cancelled,
        }
    }

    /// Borrows the result or re-surfaces the failure.
    pub fn as_result(&self) -> Result<&T, TaskError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Faulted(fault) => Err(TaskError::Faulted(fault.clone())),
            Outcome::Cancelled => Err(TaskError::Cancelled),
        }
    }

    pub(crate) fn fault(&self) -> Option<&Fault> {
        match self {
            Outcome::Faulted(fault) => Some(fault),
            _ => None,
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T>
where
    E: Into<anyhow::Error>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Faulted(Fault::new(err)),
        }
    }
}
