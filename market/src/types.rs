use serde::{Deserialize, Serialize};

use crate::engine::FlowMetrics;
use crate::pulse::vpin::NEUTRAL_VPIN;
use crate::pulse::{finite_in, saturating_add};
use crate::error::TradeError;

/// Raw trade as delivered by a feed adapter, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Execution time (ms since epoch).
    pub ts_ms: i64,
    pub price: f64,
    pub quantity: f64,
    /// True if the aggressor was a seller (maker was the buyer).
    pub is_sell_initiated: bool,
}

/// One validated execution. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trade {
    ts_ms: i64,
    price: f64,
    quantity: f64,
    is_sell_initiated: bool,
}

impl Trade {
    /// Builds a trade, rejecting non-finite or non-positive price/quantity.
    pub fn new(
        ts_ms: i64,
        price: f64,
        quantity: f64,
        is_sell_initiated: bool,
    ) -> Result<Self, TradeError> {
        if !price.is_finite() {
            return Err(TradeError::NonFiniteValue { field: "price" });
        }
        if !quantity.is_finite() {
            return Err(TradeError::NonFiniteValue { field: "quantity" });
        }
        if price <= 0.0 {
            return Err(TradeError::NonPositivePrice(price));
        }
        if quantity <= 0.0 {
            return Err(TradeError::NonPositiveQuantity(quantity));
        }

        Ok(Self {
            ts_ms,
            price,
            quantity,
            is_sell_initiated,
        })
    }

    pub fn ts_ms(&self) -> i64 {
        self.ts_ms
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn is_sell_initiated(&self) -> bool {
        self.is_sell_initiated
    }

    /// Quote-currency value of the execution.
    /// Notional `price * quantity`, saturated at `f64::MAX`.
    pub fn value(&self) -> f64 {
        (self.price * self.quantity).min(f64::MAX)
    }
}

impl TryFrom<TradeEvent> for Trade {
    type Error = TradeError;

    fn try_from(ev: TradeEvent) -> Result<Self, Self::Error> {
        Trade::new(ev.ts_ms, ev.price, ev.quantity, ev.is_sell_initiated)
    }
}

/// Externally visible result of one scheduler tick.
///
/// Immutable once produced; every field is finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Tick time (ms since epoch).
    pub ts_ms: i64,

    /// Base-asset volume by aggressor side.
    pub buy_volume: f64,
    pub sell_volume: f64,

    /// Buy value minus sell value (quote currency).
    pub net_flow: f64,

    /// Order-flow toxicity in [0, 1].
    pub toxicity: f64,

    /// Order imbalance in [-1, 1].
    pub imbalance: f64,

    /// Mean relative price move after large trades (>= 0).
    pub market_impact: f64,

    /// Volume-synchronized informed-trading probability in [0, 1].
    pub vpin: f64,
}

impl MetricSnapshot {
    pub fn new(ts_ms: i64, metrics: &FlowMetrics) -> Self {
        Self {
            ts_ms,
            buy_volume: finite_in(metrics.volumes.buy_volume, 0.0, f64::MAX, 0.0),
            sell_volume: finite_in(metrics.volumes.sell_volume, 0.0, f64::MAX, 0.0),
            net_flow: finite_in(metrics.volumes.net_flow(), f64::MIN, f64::MAX, 0.0),
            toxicity: finite_in(metrics.toxicity.value, 0.0, 1.0, 0.0),
            imbalance: finite_in(metrics.volumes.imbalance(), -1.0, 1.0, 0.0),
            market_impact: finite_in(metrics.impact.value, 0.0, f64::MAX, 0.0),
            vpin: finite_in(metrics.vpin.value, 0.0, 1.0, NEUTRAL_VPIN),
        }
    }

    pub fn total_volume(&self) -> f64 {
        saturating_add(self.buy_volume, self.sell_volume)
    }

    /// True when every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        [
            self.buy_volume,
            self.sell_volume,
            self.net_flow,
            self.toxicity,
            self.imbalance,
            self.market_impact,
            self.vpin,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
