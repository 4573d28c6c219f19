//! Metrics engine: runs every flow pulse over one window.
//!
//! Pure and stateless with respect to the analyzer; identical windows always
//! give identical metrics.

use serde::{Deserialize, Serialize};

use crate::pulse::{
    FlowPulse, ImpactPulse, ImpactReading, ToxicityPulse, ToxicityReading, VolumeBreakdown,
    VolumePulse, VpinPulse, VpinReading, impact, toxicity, vpin,
};
use crate::types::Trade;

/// Tunables for the pulses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub min_trades_for_toxicity: usize,
    pub min_trades_for_vpin: usize,
    pub vpin_bucket_count: usize,
    pub large_trade_multiple: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_trades_for_toxicity: toxicity::DEFAULT_MIN_TRADES,
            min_trades_for_vpin: vpin::DEFAULT_MIN_TRADES,
            vpin_bucket_count: vpin::DEFAULT_BUCKET_COUNT,
            large_trade_multiple: impact::DEFAULT_LARGE_TRADE_MULTIPLE,
        }
    }
}

/// Every pulse reading for one window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlowMetrics {
    pub volumes: VolumeBreakdown,
    pub toxicity: ToxicityReading,
    pub impact: ImpactReading,
    pub vpin: VpinReading,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsEngine {
    volume: VolumePulse,
    toxicity: ToxicityPulse,
    impact: ImpactPulse,
    vpin: VpinPulse,
}

impl MetricsEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            volume: VolumePulse,
            toxicity: ToxicityPulse::new(cfg.min_trades_for_toxicity),
            impact: ImpactPulse::new(cfg.large_trade_multiple),
            vpin: VpinPulse::new(cfg.min_trades_for_vpin, cfg.vpin_bucket_count),
        }
    }

    /// Computes all metrics over a time-ordered window.
    pub fn compute(&self, trades: &[Trade]) -> FlowMetrics {
        FlowMetrics {
            volumes: self.volume.evaluate(trades),
            toxicity: self.toxicity.evaluate(trades),
            impact: self.impact.evaluate(trades),
            vpin: self.vpin.evaluate(trades),
        }
    }
}
