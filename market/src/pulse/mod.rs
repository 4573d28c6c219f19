//! Flow Pulse Abstraction
//!
//! A pulse is a side-effect-free observer that derives one flow signal
//! (volumes, toxicity, market impact, VPIN) from a window of trades.
//! Pulses hold only their configuration; all state lives in the window.

pub mod impact;
pub mod toxicity;
pub mod volume;
pub mod vpin;

pub use self::impact::{ImpactPulse, ImpactReading};
pub use self::toxicity::{ToxicityPulse, ToxicityReading};
pub use self::volume::{VolumeBreakdown, VolumePulse};
pub use self::vpin::{VolumeBucket, VpinPulse, VpinReading};

use crate::types::Trade;

/// Whether a pulse had enough data to compute its signal.
///
/// An `Insufficient` reading still carries a well-defined neutral value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PulseValidity {
    /// Below the pulse's minimum trade count; value is the neutral default.
    #[default]
    Insufficient,
    /// Computed from the window.
    Valid,
}

/// Derives a signal from a time-ordered trade window.
pub trait FlowPulse {
    /// The specific signal produced by this pulse.
    type Output;

    /// Computes the signal.
    ///
    /// Must be deterministic, never panic, and never return NaN or infinity.
    fn evaluate(&self, trades: &[Trade]) -> Self::Output;
}

/// Maps NaN/inf to `fallback` and clamps into `[lo, hi]`.
pub(crate) fn finite_in(value: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    }
}

/// Finite-input sum clamped to `±f64::MAX` instead of overflowing to infinity.
pub(crate) fn saturating_add(a: f64, b: f64) -> f64 {
    (a + b).clamp(f64::MIN, f64::MAX)
}

/// Population mean and variance. Callers guarantee a non-empty slice.
pub(crate) fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}
