use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    // ingestion
    pub trades_accepted: Arc<AtomicU64>,
    pub trades_evicted: Arc<AtomicU64>,

    // rejection reasons
    pub trades_stale: Arc<AtomicU64>,
    pub trades_malformed: Arc<AtomicU64>,

    // ticks
    pub ticks_published: Arc<AtomicU64>,
    pub ticks_skipped: Arc<AtomicU64>,
    pub ticks_insufficient: Arc<AtomicU64>,

    pub alerts_emitted: Arc<AtomicU64>,
    pub sink_dropped: Arc<AtomicU64>,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let get = |c: &Arc<AtomicU64>| c.load(Ordering::Relaxed);
        CounterSnapshot {
            trades_accepted: get(&self.trades_accepted),
            trades_evicted: get(&self.trades_evicted),
            trades_stale: get(&self.trades_stale),
            trades_malformed: get(&self.trades_malformed),
            ticks_published: get(&self.ticks_published),
            ticks_skipped: get(&self.ticks_skipped),
            ticks_insufficient: get(&self.ticks_insufficient),
            alerts_emitted: get(&self.alerts_emitted),
            sink_dropped: get(&self.sink_dropped),
        }
    }
}

/// Point-in-time copy of [`Counters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub trades_accepted: u64,
    pub trades_evicted: u64,
    pub trades_stale: u64,
    pub trades_malformed: u64,
    pub ticks_published: u64,
    pub ticks_skipped: u64,
    pub ticks_insufficient: u64,
    pub alerts_emitted: u64,
    pub sink_dropped: u64,
}

impl CounterSnapshot {
    /// Stale plus malformed trades.
    pub fn trades_rejected(&self) -> u64 {
        self.trades_stale + self.trades_malformed
    }
}
