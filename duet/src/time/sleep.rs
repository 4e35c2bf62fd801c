use super::timer;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Creates a future that completes once `duration` has elapsed.
///
/// # Examples
///
/// ```rust,ignore
/// scheduler.spawn_future(async {
///     sleep(Duration::from_millis(250)).await;
///     "warmed up"
/// });
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep {
        deadline: Instant::now() + duration,
        registered: None,
    }
}

/// A future that completes once a deadline is reached.
///
/// Inside a routine it is polled once per tick, so it completes on the first
/// tick at or after the deadline. Under any other executor the waker is
/// handed to a shared timer thread, which wakes it when the deadline passes.
#[derive(Debug)]
pub struct Sleep {
    deadline: Instant,

    /// Waker currently held by the timer, with its cancellation flag.
    registered: Option<(Waker, Arc<AtomicBool>)>,
}

impl Sleep {
    /// The instant at which the sleep completes.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns `true` once the deadline has passed.
    pub fn is_elapsed(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn cancel_registration(&mut self) {
        if let Some((_, cancelled)) = self.registered.take() {
            cancelled.store(true, Ordering::Release);
        }
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();

        if this.is_elapsed() {
            this.cancel_registration();
            return Poll::Ready(());
        }

        // The scheduler polls every live routine each tick.
        if cx.waker().will_wake(Waker::noop()) {
            return Poll::Pending;
        }

        if this
            .registered
            .as_ref()
            .is_some_and(|(waker, _)| waker.will_wake(cx.waker()))
        {
            return Poll::Pending;
        }

        this.cancel_registration();

        let cancelled = Arc::new(AtomicBool::new(false));
        if timer::register(this.deadline, cx.waker(), cancelled.clone()) {
            this.registered = Some((cx.waker().clone(), cancelled));
        } else {
            cx.waker().wake_by_ref();
        }

        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.cancel_registration();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::task::Wake;
    use std::thread;

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for_wakes(counter: &CountingWaker, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if counter.0.load(Ordering::SeqCst) >= expected {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_timer_wakes_once_at_deadline() {
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);

        let mut sleep = sleep(Duration::from_millis(30));
        assert!(Pin::new(&mut sleep).poll(&mut cx).is_pending());
        // Polling again with the same waker neither wakes nor re-registers.
        assert!(Pin::new(&mut sleep).poll(&mut cx).is_pending());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        assert!(wait_for_wakes(&counter, 1));
        assert!(Pin::new(&mut sleep).poll(&mut cx).is_ready());

        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_sleep_is_not_woken() {
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);

        let mut sleep = sleep(Duration::from_millis(20));
        assert!(Pin::new(&mut sleep).poll(&mut cx).is_pending());
        drop(sleep);

        thread::sleep(Duration::from_millis(80));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_noop_waker_is_not_registered() {
        let mut cx = Context::from_waker(Waker::noop());
        let mut sleep = sleep(Duration::from_secs(60));

        assert!(Pin::new(&mut sleep).poll(&mut cx).is_pending());
        assert!(sleep.registered.is_none());
    }
}
