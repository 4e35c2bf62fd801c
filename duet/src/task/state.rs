use std::fmt;

/// Task has been created but its work has not started.
pub(crate) const PENDING: u8 = 0;

/// Task work has started.
///
/// Set exactly once, by the single producer of the task (a pool worker or
/// the driving scheduler). Terminal states are not encoded here: they live
/// in the task's published outcome.
pub(crate) const RUNNING: u8 = 1;

/// Observable lifecycle of a task.
///
/// Transitions only move forward: `Pending → Running → {Success, Faulted}`,
/// or to `Cancelled` from any non-terminal state. Once terminal, a task's
/// status never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Created, not started.
    Pending,

    /// Work is in progress.
    Running,

    /// Completed and produced a result.
    Success,

    /// Completed with a captured failure.
    Faulted,

    /// Observation was abandoned before completion.
    Cancelled,
}

impl Status {
    /// Returns `true` for `Success`, `Faulted` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Faulted | Status::Cancelled)
    }

    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            RUNNING => Status::Running,
            _ => Status::Pending,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Success => "success",
            Status::Faulted => "faulted",
            Status::Cancelled => "cancelled",
        };

        f.write_str(name)
    }
}

/// How a task's work gets executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// A function run once on a worker thread.
    Background,

    /// A routine advanced one step per scheduler tick.
    Cooperative,

    /// Resolved at construction; never scheduled.
    Custom,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Background => "background",
            Strategy::Cooperative => "cooperative",
            Strategy::Custom => "custom",
        };

        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_outcomes_are_terminal() {
        assert!(!Status::Pending.is_terminal());
        assert!(!Status::Running.is_terminal());
        assert!(Status::Success.is_terminal());
        assert!(Status::Faulted.is_terminal());
        assert!(Status::Cancelled.is_terminal());
    }

    #[test]
    fn codes_decode_to_live_states() {
        assert_eq!(Status::from_code(PENDING), Status::Pending);
        assert_eq!(Status::from_code(RUNNING), Status::Running);
    }
}
