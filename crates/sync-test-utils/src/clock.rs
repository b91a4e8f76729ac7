//! [`FixedClock`]: a [`Clock`] that only moves when told to.

use std::sync::atomic::{AtomicU64, Ordering};

use sync_fs::Clock;

#[derive(Debug, Default)]
pub struct FixedClock {
    ticks: AtomicU64,
}

impl FixedClock {
    pub fn new(ticks: u64) -> Self {
        Self {
            ticks: AtomicU64::new(ticks),
        }
    }

    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    pub fn advance(&self, by: u64) {
        self.ticks.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}
