//! Toxicity Pulse
//!
//! Heuristic order-flow toxicity score combining two proxies for urgent,
//! information-driven flow:
//!
//! - **price volatility**: dispersion of traded prices relative to their level
//! - **arrival irregularity**: dispersion of inter-trade gaps relative to the
//!   mean gap (bursty tapes score high, evenly paced tapes score zero)
//!
//! ## Definition
//!
//! ```text
//! price_volatility = sqrt(var(price)) / mean(price)
//! gap[i]           = ts[i] - ts[i-1]
//! toxicity         = min(1, price_volatility * 10 * sqrt(var(gap)) / mean(gap))
//! ```
//!
//! Variances are population variances. When every trade shares a timestamp
//! (`mean(gap) == 0`) the irregularity factor is dropped:
//! `toxicity = min(1, price_volatility * 10)`.
//!
//! ## Warm-up guard
//! Fewer than `min_trades` trades yields `0.0` with `Insufficient` validity.
//!
//! This is a bespoke risk heuristic, not a published estimator.

use super::{FlowPulse, PulseValidity, finite_in, mean_and_variance};
use crate::types::Trade;

pub const DEFAULT_MIN_TRADES: usize = 10;

/// Scales relative volatility into the [0, 1] score range.
const VOLATILITY_SCALE: f64 = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToxicityReading {
    /// Score in [0, 1].
    pub value: f64,
    /// `stddev(price) / mean(price)`.
    pub price_volatility: f64,
    /// `stddev(gap) / mean(gap)`; 0 when gaps are all zero.
    pub arrival_irregularity: f64,
    pub validity: PulseValidity,
}

#[derive(Clone, Copy, Debug)]
pub struct ToxicityPulse {
    min_trades: usize,
}

impl Default for ToxicityPulse {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TRADES)
    }
}

impl ToxicityPulse {
    /// At least two trades are always required to form a gap.
    pub fn new(min_trades: usize) -> Self {
        Self {
            min_trades: min_trades.max(2),
        }
    }
}

impl FlowPulse for ToxicityPulse {
    type Output = ToxicityReading;

    fn evaluate(&self, trades: &[Trade]) -> ToxicityReading {
        if trades.len() < self.min_trades {
            return ToxicityReading::default();
        }

        let prices: Vec<f64> = trades.iter().map(Trade::price).collect();
        let (mean_price, price_var) = mean_and_variance(&prices);
        let price_volatility = finite_in(price_var.sqrt() / mean_price, 0.0, f64::MAX, 0.0);

        let gaps: Vec<f64> = trades
            .windows(2)
            .map(|w| w[1].ts_ms().saturating_sub(w[0].ts_ms()) as f64)
            .collect();
        let (mean_gap, gap_var) = mean_and_variance(&gaps);

        let (raw, arrival_irregularity) = if mean_gap == 0.0 {
            (price_volatility * VOLATILITY_SCALE, 0.0)
        } else {
            let irregularity = gap_var.sqrt() / mean_gap;
            (
                price_volatility * VOLATILITY_SCALE * irregularity,
                finite_in(irregularity, 0.0, f64::MAX, 0.0),
            )
        };

        ToxicityReading {
            value: finite_in(raw, 0.0, 1.0, 0.0),
            price_volatility,
            arrival_irregularity,
            validity: PulseValidity::Valid,
        }
    }
}
