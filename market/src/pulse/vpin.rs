//! VPIN Pulse (volume-synchronized probability of informed trading)
//!
//! ## Definition
//! The window's total quantity is split into `bucket_count` equal-volume
//! buckets:
//!
//! ```text
//! bucket_size = sum(quantity) / bucket_count
//! ```
//!
//! Trades are poured into buckets in arrival order, each adding to the buy or
//! sell side according to its aggressor. A trade larger than the room left in
//! the current bucket is split: the bucket is topped up and closed, and the
//! remainder flows into the next bucket. Filling stops once `bucket_count`
//! buckets are closed; a trailing partial bucket is discarded.
//!
//! ```text
//! bucket_vpin = |buy - sell| / (buy + sell)
//! vpin        = mean(bucket_vpin over closed buckets)
//! ```
//!
//! ## Warm-up guard
//! Fewer than `min_trades` trades yields the neutral prior `0.5`.
//!
//! ## Notes
//! Side classification uses the tape's aggressor flag rather than bulk-volume
//! classification, so this is a heuristic VPIN, not the textbook estimator.

use super::{FlowPulse, PulseValidity, finite_in};
use crate::types::Trade;

pub const DEFAULT_MIN_TRADES: usize = 50;
pub const DEFAULT_BUCKET_COUNT: usize = 50;

/// Neutral prior used when VPIN cannot be computed.
pub const NEUTRAL_VPIN: f64 = 0.5;

/// One equal-volume partition of the trade sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumeBucket {
    pub buy_volume: f64,
    pub sell_volume: f64,
    /// Running fill toward the bucket size.
    pub volume: f64,
}

impl VolumeBucket {
    fn add(&mut self, qty: f64, is_sell: bool) {
        if is_sell {
            self.sell_volume += qty;
        } else {
            self.buy_volume += qty;
        }
        self.volume += qty;
    }

    /// `|buy - sell| / (buy + sell)`, 0 for an empty bucket.
    pub fn imbalance(&self) -> f64 {
        let total = self.buy_volume + self.sell_volume;
        if total > 0.0 {
            finite_in((self.buy_volume - self.sell_volume).abs() / total, 0.0, 1.0, 0.0)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VpinReading {
    /// VPIN in [0, 1]; `NEUTRAL_VPIN` when insufficient.
    pub value: f64,
    pub bucket_size: f64,
    pub closed_buckets: usize,
    pub validity: PulseValidity,
}

impl Default for VpinReading {
    fn default() -> Self {
        Self {
            value: NEUTRAL_VPIN,
            bucket_size: 0.0,
            closed_buckets: 0,
            validity: PulseValidity::Insufficient,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct VpinPulse {
    min_trades: usize,
    bucket_count: usize,
}

impl Default for VpinPulse {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TRADES, DEFAULT_BUCKET_COUNT)
    }
}

impl VpinPulse {
    pub fn new(min_trades: usize, bucket_count: usize) -> Self {
        Self {
            min_trades: min_trades.max(1),
            bucket_count: bucket_count.max(1),
        }
    }
}

/// Pours `trades` into equal buckets of `bucket_size`, splitting trades across
/// boundaries, and returns at most `max_buckets` closed buckets.
pub fn fill_buckets(trades: &[Trade], bucket_size: f64, max_buckets: usize) -> Vec<VolumeBucket> {
    let mut closed = Vec::with_capacity(max_buckets);
    if !bucket_size.is_finite() || bucket_size <= 0.0 {
        return closed;
    }

    let mut current = VolumeBucket::default();

    'trades: for t in trades {
        let mut remaining = t.quantity();

        while remaining > 0.0 {
            let room = bucket_size - current.volume;

            if remaining < room {
                current.add(remaining, t.is_sell_initiated());
                continue 'trades;
            }

            // Top up exactly to the boundary and close.
            current.add(room, t.is_sell_initiated());
            current.volume = bucket_size;
            closed.push(current);
            current = VolumeBucket::default();
            remaining -= room;

            if closed.len() == max_buckets {
                break 'trades;
            }
        }
    }

    closed
}

impl FlowPulse for VpinPulse {
    type Output = VpinReading;

    fn evaluate(&self, trades: &[Trade]) -> VpinReading {
        if trades.len() < self.min_trades {
            return VpinReading::default();
        }

        let total_volume: f64 = trades.iter().map(Trade::quantity).sum();
        let bucket_size = total_volume / self.bucket_count as f64;

        let buckets = fill_buckets(trades, bucket_size, self.bucket_count);
        if buckets.is_empty() {
            return VpinReading {
                bucket_size,
                ..VpinReading::default()
            };
        }

        let mean = buckets.iter().map(VolumeBucket::imbalance).sum::<f64>() / buckets.len() as f64;

        VpinReading {
            value: finite_in(mean, 0.0, 1.0, NEUTRAL_VPIN),
            bucket_size,
            closed_buckets: buckets.len(),
            validity: PulseValidity::Valid,
        }
    }
}
