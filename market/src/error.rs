use std::num::ParseFloatError;

use thiserror::Error;

/// Reasons a trade is refused by validation or by the buffer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("price must be positive, got {0}")]
    NonPositivePrice(f64),

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(f64),

    #[error("{field} is not a finite number")]
    NonFiniteValue { field: &'static str },

    #[error("stale trade: ts {ts_ms} is older than last stored ts {last_ts_ms}")]
    StaleTimestamp { ts_ms: i64, last_ts_ms: i64 },
}

impl TradeError {
    /// Stale trades are feed redeliveries; everything else is malformed input.
    pub fn is_stale(&self) -> bool {
        matches!(self, TradeError::StaleTimestamp { .. })
    }
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("json decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("numeric parse error: {0}")]
    ParseFloat(#[from] ParseFloatError),

    #[error("invalid trade: {0}")]
    InvalidTrade(#[from] TradeError),
}
