//! Hybrid version clock for cart writes.

use crate::model::Version;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues strictly increasing [`Version`]s close to wall-clock milliseconds.
///
/// Each tick is `max(now_ms, last + 1)`, so versions keep increasing when the wall
/// clock stalls or steps back, and [`VersionClock::observe`] lets versions read from
/// storage push the clock forward.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next version.
    pub fn tick(&self) -> Version {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let next = now.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Version(next),
                Err(actual) => last = actual,
            }
        }
    }

    /// Makes every later tick greater than `version`.
    pub fn observe(&self, version: Version) {
        self.last.fetch_max(version.0, Ordering::AcqRel);
    }

    /// The last version issued or observed.
    pub fn current(&self) -> Version {
        Version(self.last.load(Ordering::Acquire))
    }
}
