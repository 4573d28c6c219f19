//! Market impact of abnormally large trades.
//!
//! A trade is "large" when its value exceeds `large_trade_multiple` times the
//! window's mean trade value. Its impact is the relative move to the very next
//! trade's price; the pulse reports the mean over all large trades that have a
//! successor in the window.

use super::{FlowPulse, finite_in};
use crate::types::Trade;

pub const DEFAULT_LARGE_TRADE_MULTIPLE: f64 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImpactReading {
    /// Mean relative post-trade move (>= 0); 0 without observations.
    pub value: f64,
    /// Number of large trades that contributed.
    pub observations: usize,
    /// Mean `price * quantity` over the window.
    pub avg_trade_value: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct ImpactPulse {
    large_trade_multiple: f64,
}

impl Default for ImpactPulse {
    fn default() -> Self {
        Self::new(DEFAULT_LARGE_TRADE_MULTIPLE)
    }
}

impl ImpactPulse {
    pub fn new(large_trade_multiple: f64) -> Self {
        Self {
            large_trade_multiple,
        }
    }
}

impl FlowPulse for ImpactPulse {
    type Output = ImpactReading;

    fn evaluate(&self, trades: &[Trade]) -> ImpactReading {
        if trades.len() < 2 {
            return ImpactReading::default();
        }

        let avg_trade_value = trades.iter().map(Trade::value).sum::<f64>() / trades.len() as f64;
        let threshold = avg_trade_value * self.large_trade_multiple;

        let (total, observations) = trades
            .windows(2)
            .filter(|w| w[0].value() > threshold)
            .map(|w| (w[1].price() - w[0].price()).abs() / w[0].price())
            .fold((0.0, 0usize), |(sum, n), impact| (sum + impact, n + 1));

        let value = if observations > 0 {
            finite_in(total / observations as f64, 0.0, f64::MAX, 0.0)
        } else {
            0.0
        };

        ImpactReading {
            value,
            observations,
            avg_trade_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::test_support::series;
    use proptest::prelude::*;

    #[test]
    fn no_large_trades_means_no_impact() {
        let trades = series(0, 10, &[(100.0, 1.0, false), (101.0, 1.2, true), (99.0, 0.9, false)]);
        let r = ImpactPulse::default().evaluate(&trades);

        assert_eq!(r.value, 0.0);
        assert_eq!(r.observations, 0);
    }

    #[test]
    fn measures_move_after_block_trade() {
        let mut rows = vec![(100.0, 1.0, false); 20];
        rows[10] = (100.0, 50.0, false);
        rows[11] = (103.0, 1.0, false);
        let r = ImpactPulse::default().evaluate(&series(0, 10, &rows));

        assert_eq!(r.observations, 1);
        assert!((r.value - 0.03).abs() < 1e-12);
    }

    #[test]
    fn last_trade_has_no_successor() {
        let mut rows = vec![(100.0, 1.0, false); 20];
        rows[19] = (100.0, 500.0, true);
        let r = ImpactPulse::default().evaluate(&series(0, 10, &rows));

        assert_eq!(r.observations, 0);
        assert_eq!(r.value, 0.0);
    }

    #[test]
    fn averages_multiple_observations() {
        let mut rows = vec![(100.0, 1.0, false); 40];
        rows[5] = (100.0, 30.0, false);
        rows[6] = (101.0, 1.0, false);
        rows[20] = (100.0, 30.0, true);
        rows[21] = (97.0, 1.0, true);
        let r = ImpactPulse::default().evaluate(&series(0, 10, &rows));

        assert_eq!(r.observations, 2);
        assert!((r.value - 0.02).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn impact_is_never_negative(
            rows in prop::collection::vec((0.01f64..1_000.0, 0.001f64..500.0, any::<bool>()), 0..150)
        ) {
            let r = ImpactPulse::default().evaluate(&series(0, 1, &rows));
            prop_assert!(r.value.is_finite());
            prop_assert!(r.value >= 0.0);
            if r.observations == 0 {
                prop_assert_eq!(r.value, 0.0);
            }
        }
    }
}
