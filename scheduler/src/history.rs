//! Bounded trailing history of snapshots and the flow summary derived from it.

use std::collections::VecDeque;

use market::MetricSnapshot;
use parking_lot::RwLock;
use serde::Serialize;

/// Ring of the most recent snapshots, oldest first.
#[derive(Debug)]
pub struct SnapshotHistory {
    capacity: usize,
    inner: RwLock<VecDeque<MetricSnapshot>>,
}

impl SnapshotHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, snapshot: MetricSnapshot) {
        let mut g = self.inner.write();
        if g.len() >= self.capacity {
            g.pop_front();
        }
        g.push_back(snapshot);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn last_ts_ms(&self) -> Option<i64> {
        self.inner.read().back().map(|s| s.ts_ms)
    }

    /// All retained snapshots, oldest first.
    pub fn to_vec(&self) -> Vec<MetricSnapshot> {
        self.inner.read().iter().copied().collect()
    }

    /// The newest `n` snapshots, oldest first.
    pub fn recent(&self, n: usize) -> Vec<MetricSnapshot> {
        let g = self.inner.read();
        let skip = g.len().saturating_sub(n);
        g.iter().skip(skip).copied().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowTrend {
    Bullish,
    Bearish,
    Neutral,
}

/// Operator-facing digest of recent snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowSummary {
    /// Net flow of the newest snapshot.
    pub net_flow: f64,
    pub avg_toxicity: f64,
    /// Largest |imbalance| seen.
    pub max_imbalance: f64,
    /// Total volume of the newest snapshot.
    pub total_volume: f64,
    /// Buy share of the newest snapshot's volume, in percent (50 if no volume).
    pub buy_ratio: f64,
    pub trend: FlowTrend,
}

impl FlowSummary {
    /// Summarises `recent` (oldest first). `None` when empty.
    pub fn from_snapshots(recent: &[MetricSnapshot], trend_threshold: f64) -> Option<Self> {
        let latest = recent.last()?;
        let n = recent.len() as f64;

        let avg_toxicity = recent.iter().map(|s| s.toxicity).sum::<f64>() / n;
        let max_imbalance = recent
            .iter()
            .map(|s| s.imbalance.abs())
            .fold(0.0, f64::max);
        let avg_net_flow = recent.iter().map(|s| s.net_flow).sum::<f64>() / n;

        let total_volume = latest.total_volume();
        let buy_ratio = if total_volume > 0.0 {
            latest.buy_volume / total_volume * 100.0
        } else {
            50.0
        };

        let trend = if avg_net_flow > trend_threshold {
            FlowTrend::Bullish
        } else if avg_net_flow < -trend_threshold {
            FlowTrend::Bearish
        } else {
            FlowTrend::Neutral
        };

        Some(Self {
            net_flow: latest.net_flow,
            avg_toxicity,
            max_imbalance,
            total_volume,
            buy_ratio,
            trend,
        })
    }
}
