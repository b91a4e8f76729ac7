//! Wake-up signalling and the coarse decisecond clock.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Sticky wake-up flag.
///
/// Completion callbacks call [`notify`](Waiter::notify); the consuming loop
/// blocks in [`wait`](Waiter::wait) until at least one notification arrived
/// since its last wake-up.
#[derive(Debug, Default)]
pub struct Waiter {
    notified: Mutex<bool>,
    cond: Condvar,
}

impl Waiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        *self.notified.lock() = true;
        self.cond.notify_all();
    }

    pub fn is_notified(&self) -> bool {
        *self.notified.lock()
    }

    /// Block until notified, consuming the notification.
    pub fn wait(&self) {
        let mut notified = self.notified.lock();
        while !*notified {
            self.cond.wait(&mut notified);
        }
        *notified = false;
    }

    /// Like [`wait`](Waiter::wait), giving up after `timeout`.
    ///
    /// Returns whether a notification was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut notified = self.notified.lock();
        while !*notified {
            if self.cond.wait_until(&mut notified, deadline).timed_out() {
                break;
            }
        }
        std::mem::take(&mut *notified)
    }
}

/// Coarse monotonic clock counting deciseconds.
///
/// Tick 0 is reserved: notifications use it to mean "process immediately".
pub trait Clock: Send + Sync {
    fn ticks(&self) -> u64;
}

/// [`Clock`] backed by [`Instant`], starting at tick 1.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn ticks(&self) -> u64 {
        let ds = self.origin.elapsed().as_millis() / 100;
        u64::try_from(ds).unwrap_or(u64::MAX - 1) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn notification_is_sticky_until_consumed() {
        let waiter = Waiter::new();
        waiter.notify();
        assert!(waiter.is_notified());
        waiter.wait();
        assert!(!waiter.is_notified());
        assert!(!waiter.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn wait_wakes_on_cross_thread_notify() {
        let waiter = Arc::new(Waiter::new());
        let remote = Arc::clone(&waiter);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.notify();
        });

        assert!(waiter.wait_timeout(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn monotonic_clock_never_reports_zero() {
        let clock = MonotonicClock::new();
        let first = clock.ticks();
        assert!(first >= 1);
        assert!(clock.ticks() >= first);
    }
}
