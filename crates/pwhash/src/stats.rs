//! Latency accounting for a single operation.
//!
//! [`StatsCollector`] keeps a call count and the cumulative latency of every
//! recorded sample behind one lock, so a snapshot never pairs a count from one
//! update with a total from another.

use core::time::Duration;
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Default)]
struct Accumulator {
    count: u64,
    total: Duration,
}

/// Count and cumulative latency of one operation.
#[derive(Default)]
pub struct StatsCollector {
    inner: Mutex<Accumulator>,
}

/// Point-in-time view of a [`StatsCollector`].
///
/// `average` is in whole microseconds, truncated. With no samples recorded it
/// is `0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub average: u64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample.
    pub fn record(&self, elapsed: Duration) {
        let mut acc = self.inner.lock();
        acc.count += 1;
        acc.total = acc.total.saturating_add(elapsed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let (count, total) = {
            let acc = self.inner.lock();
            (acc.count, acc.total)
        };

        let average = if count == 0 {
            0
        } else {
            let micros = u64::try_from(total.as_micros()).unwrap_or(u64::MAX);
            micros / count
        };

        StatsSnapshot {
            total: count,
            average,
        }
    }
}
