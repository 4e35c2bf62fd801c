use crate::runtime::context;

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

/// How long a waiting worker sleeps before looking for queued jobs again.
const HELP_INTERVAL: Duration = Duration::from_millis(1);

/// Wakes a parked thread.
struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Drives `future` to completion on the calling thread, parking between polls.
///
/// On a pool worker, queued jobs are run between polls instead of parking,
/// so a job waiting on a job it submitted cannot starve the pool.
///
/// Returns `None` if `deadline` passes first.
pub(crate) fn block_on<F: Future>(future: F, deadline: Option<Instant>) -> Option<F::Output> {
    let mut future = pin!(future);

    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);

    let worker = context::current_worker();

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return Some(output);
        }

        let remaining = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                Some(deadline - now)
            }
            None => None,
        };

        match (&worker, remaining) {
            (Some(worker), _) if worker.run_next() => {}
            (Some(_), remaining) => {
                thread::park_timeout(remaining.map_or(HELP_INTERVAL, |r| r.min(HELP_INTERVAL)));
            }
            (None, Some(remaining)) => thread::park_timeout(remaining),
            (None, None) => thread::park(),
        }
    }
}
