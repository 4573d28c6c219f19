use super::{FlowPulse, saturating_add};
use crate::types::Trade;

/// Side-split volumes and values over a window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumeBreakdown {
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub buy_value: f64,
    pub sell_value: f64,
    pub trade_count: usize,
}

impl VolumeBreakdown {
    pub fn total_volume(&self) -> f64 {
        saturating_add(self.buy_volume, self.sell_volume)
    }

    /// Buy value minus sell value.
    pub fn net_flow(&self) -> f64 {
        saturating_add(self.buy_value, -self.sell_value)
    }

    /// `(buy - sell) / total` in [-1, 1]; 0 with no volume.
    pub fn imbalance(&self) -> f64 {
        let total = self.total_volume();
        if total > 0.0 {
            super::finite_in((self.buy_volume - self.sell_volume) / total, -1.0, 1.0, 0.0)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VolumePulse;

impl FlowPulse for VolumePulse {
    type Output = VolumeBreakdown;

    fn evaluate(&self, trades: &[Trade]) -> VolumeBreakdown {
        trades.iter().fold(VolumeBreakdown::default(), |mut acc, t| {
            if t.is_sell_initiated() {
                acc.sell_volume = saturating_add(acc.sell_volume, t.quantity());
                acc.sell_value = saturating_add(acc.sell_value, t.value());
            } else {
                acc.buy_volume = saturating_add(acc.buy_volume, t.quantity());
                acc.buy_value = saturating_add(acc.buy_value, t.value());
            }
            acc.trade_count += 1;
            acc
        })
    }
}
