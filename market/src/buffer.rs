//! Bounded, time-ordered store of recent trades for one instrument.
//!
//! Shared between the feed consumer (writer) and the scheduler (reader).
//! Both sides hold the lock only for O(window) work: appends are O(1) and
//! reads copy the requested suffix out before any computation happens.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::TradeError;
use crate::types::Trade;

pub const DEFAULT_CAPACITY: usize = 1_000;

/// Result of a successful [`TradeBuffer::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Number of oldest trades evicted to stay within capacity (0 or 1).
    pub evicted: usize,
    /// Trade count after the insert.
    pub len: usize,
}

#[derive(Debug)]
struct Inner {
    /// Ordered oldest-first, non-decreasing in `ts_ms`.
    trades: VecDeque<Trade>,
    capacity: usize,
    /// Survives eviction so stale redeliveries stay rejected.
    last_ts_ms: Option<i64>,
    /// Monotonic count of accepted trades since creation.
    accepted_total: u64,
}

/// Ring buffer of trades, capped by count and pruned by time on demand.
#[derive(Debug)]
pub struct TradeBuffer {
    inner: Mutex<Inner>,
}

impl Default for TradeBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TradeBuffer {
    /// Creates an empty buffer. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                trades: VecDeque::with_capacity(capacity),
                capacity,
                last_ts_ms: None,
                accepted_total: 0,
            }),
        }
    }

    /// Appends `trade` unless it is older than the newest stored trade.
    ///
    /// Equal timestamps are accepted. Overflow evicts from the front.
    pub fn ingest(&self, trade: Trade) -> Result<IngestOutcome, TradeError> {
        let mut g = self.inner.lock();

        if let Some(last_ts_ms) = g.last_ts_ms {
            if trade.ts_ms() < last_ts_ms {
                return Err(TradeError::StaleTimestamp {
                    ts_ms: trade.ts_ms(),
                    last_ts_ms,
                });
            }
        }

        let mut evicted = 0;
        while g.trades.len() >= g.capacity {
            g.trades.pop_front();
            evicted += 1;
        }

        g.trades.push_back(trade);
        g.last_ts_ms = Some(trade.ts_ms());
        g.accepted_total += 1;

        Ok(IngestOutcome {
            evicted,
            len: g.trades.len(),
        })
    }

    /// Copies out every trade with `ts_ms > cutoff_ms`, oldest first.
    pub fn snapshot_since(&self, cutoff_ms: i64) -> Vec<Trade> {
        let g = self.inner.lock();
        let start = g.trades.partition_point(|t| t.ts_ms() <= cutoff_ms);
        g.trades.range(start..).copied().collect()
    }

    /// Drops every trade with `ts_ms <= cutoff_ms`. Returns how many were removed.
    pub fn prune_through(&self, cutoff_ms: i64) -> usize {
        let mut g = self.inner.lock();
        let end = g.trades.partition_point(|t| t.ts_ms() <= cutoff_ms);
        g.trades.drain(..end);
        drop(g);

        if end > 0 {
            trace!(pruned = end, cutoff_ms, "expired trades pruned");
        }
        end
    }

    pub fn len(&self) -> usize {
        self.inner.lock().trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().trades.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Timestamp of the newest trade ever accepted.
    pub fn last_ts_ms(&self) -> Option<i64> {
        self.inner.lock().last_ts_ms
    }

    /// Total trades accepted since creation, including evicted ones.
    pub fn accepted_total(&self) -> u64 {
        self.inner.lock().accepted_total
    }

    /// Empties the buffer and forgets the stale-trade watermark.
    pub fn clear(&self) {
        let mut g = self.inner.lock();
        g.trades.clear();
        g.last_ts_ms = None;
    }
}
