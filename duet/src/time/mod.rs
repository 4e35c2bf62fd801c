//! Delays and deadlines.
//!
//! Two kinds of waiting live here:
//! - blocking: [`delay`] and the [`Sleeper`] capability put the calling
//!   thread to sleep,
//! - cooperative: [`sleep`] and [`timeout`] are futures meant to be awaited
//!   inside future-backed routines, where they suspend across scheduler
//!   ticks without ever blocking the driver. Awaited anywhere else, a
//!   shared timer thread wakes them at their deadline.

mod sleep;
mod timeout;
mod timer;

#[doc(inline)]
pub use sleep::{Sleep, sleep};

#[doc(inline)]
pub use timeout::{Timeout, timeout};

use std::thread;
use std::time::Duration;

/// Blocks the calling thread for at least a given duration.
pub trait Sleeper: Send + Sync {
    /// Sleeps for at least `duration`.
    fn sleep(&self, duration: Duration);
}

/// A [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Blocks the calling thread for at least `millis` milliseconds.
///
/// Never call this from a scheduler's driver thread while routines are
/// live: it stalls every cooperative task. Use [`sleep`] inside the routine
/// instead.
pub fn delay(millis: u64) {
    ThreadSleeper.sleep(Duration::from_millis(millis));
}
