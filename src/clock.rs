//! Time sources
//!
//! Everything that needs "now" asks a [`Clock`]. The trait has no setter:
//! only the owner of a concrete [`VirtualClock`] (the replay loop) can move
//! simulated time, every other component sees it through `Arc<dyn Clock>`.

use crate::types::Timestamp;
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> Timestamp;

    /// Current trading date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall-clock time in the local zone
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> Timestamp {
        Local::now().naive_local()
    }
}

/// Simulated time that advances only through [`VirtualClock::set_time`].
///
/// Second resolution, which matches the finest K-line timestamps.
#[derive(Debug)]
pub struct VirtualClock {
    seconds: AtomicI64,
}

impl VirtualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            seconds: AtomicI64::new(start.and_utc().timestamp()),
        }
    }

    /// Move simulated time
    pub fn set_time(&self, time: Timestamp) {
        self.seconds
            .store(time.and_utc().timestamp(), Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Timestamp {
        let secs = self.seconds.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp(secs, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }
}
