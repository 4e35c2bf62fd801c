use super::registration::Advance;

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::thread::ThreadId;

/// Registrations waiting for the next tick.
///
/// Any thread may push; only the driver drains. Once closed, pushes are
/// refused and handed back to the caller.
pub(crate) struct Inbox {
    state: Mutex<State>,

    /// Thread that owns the scheduler.
    driver: ThreadId,
}

struct State {
    queue: VecDeque<Box<dyn Advance>>,
    closed: bool,
}

impl Inbox {
    pub(crate) fn new(driver: ThreadId) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                closed: false,
            }),
            driver,
        }
    }

    pub(crate) fn driver(&self) -> ThreadId {
        self.driver
    }

    /// Queues `entry`, or returns it if the scheduler is closed.
    pub(crate) fn push(&self, entry: Box<dyn Advance>) -> Result<(), Box<dyn Advance>> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(entry);
        }

        state.queue.push_back(entry);
        Ok(())
    }

    /// Moves every queued registration to the end of `live`, in push order.
    pub(crate) fn drain_into(&self, live: &mut Vec<Box<dyn Advance>>) -> usize {
        let mut state = self.state.lock();
        let count = state.queue.len();
        live.extend(state.queue.drain(..));
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Refuses further pushes and returns what was still queued.
    pub(crate) fn close(&self) -> Vec<Box<dyn Advance>> {
        let mut state = self.state.lock();
        state.closed = true;
        state.queue.drain(..).collect()
    }
}
