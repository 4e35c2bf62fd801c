use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::task::Waker;
use std::thread;
use std::time::Instant;

/// A scheduled wake-up.
///
/// The entry may be cancelled before it fires; cancelled entries are
/// discarded when they reach the top of the queue.
struct TimerEntry {
    deadline: Instant,

    waker: Waker,

    /// Shared with the sleep that registered the entry.
    cancelled: Arc<AtomicBool>,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline.eq(&other.deadline)
    }
}

impl Ord for TimerEntry {
    /// Reversed, so that a `BinaryHeap` pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.deadline.cmp(&self.deadline)
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Process-wide timer thread waking sleeps at their deadline.
struct Timer {
    entries: Mutex<BinaryHeap<TimerEntry>>,

    condvar: Condvar,
}

/// `None` if the timer thread could not be started.
static TIMER: OnceLock<Option<Arc<Timer>>> = OnceLock::new();

fn timer() -> Option<&'static Arc<Timer>> {
    TIMER
        .get_or_init(|| {
            let timer = Arc::new(Timer {
                entries: Mutex::new(BinaryHeap::new()),
                condvar: Condvar::new(),
            });

            let runner = timer.clone();
            let spawned = thread::Builder::new()
                .name(String::from("duet-timer"))
                .spawn(move || runner.run());

            match spawned {
                Ok(_) => Some(timer),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to start timer thread");
                    None
                }
            }
        })
        .as_ref()
}

/// Wakes `waker` once `deadline` is reached, unless `cancelled` is set first.
///
/// Returns `false` if no timer thread is available, in which case the caller
/// has to arrange its own wake-up.
pub(crate) fn register(deadline: Instant, waker: &Waker, cancelled: Arc<AtomicBool>) -> bool {
    let Some(timer) = timer() else {
        return false;
    };

    timer.entries.lock().push(TimerEntry {
        deadline,
        waker: waker.clone(),
        cancelled,
    });
    timer.condvar.notify_one();

    true
}

impl Timer {
    fn run(&self) {
        let mut entries = self.entries.lock();

        loop {
            let now = Instant::now();
            let mut expired = Vec::new();

            while entries.peek().is_some_and(|entry| entry.deadline <= now) {
                if let Some(entry) = entries.pop() {
                    expired.push(entry);
                }
            }

            if !expired.is_empty() {
                // Wakers run without the lock; they may register again.
                parking_lot::MutexGuard::unlocked(&mut entries, || {
                    for entry in mem::take(&mut expired) {
                        if !entry.cancelled.load(Ordering::Acquire) {
                            entry.waker.wake();
                        }
                    }
                });
                continue;
            }

            match entries.peek().map(|entry| entry.deadline) {
                Some(deadline) => {
                    self.condvar.wait_until(&mut entries, deadline);
                }
                None => self.condvar.wait(&mut entries),
            }
        }
    }
}
