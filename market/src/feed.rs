//! Decoding of Binance `aggTrade` stream payloads into [`TradeEvent`]s.
//!
//! Only the payload format lives here; connecting to the stream is the feed
//! adapter's job.
//!
//! ```text
//! {"e":"aggTrade","E":1700000000123,"s":"BTCUSDT","a":1,"p":"37000.10","q":"0.015",
//!  "f":10,"l":12,"T":1700000000120,"m":true,"M":true}
//! ```

use serde::Deserialize;

use crate::error::FeedError;
use crate::types::{Trade, TradeEvent};

#[derive(Debug, Clone, Deserialize)]
pub struct AggTrade {
    #[serde(rename = "s", default)]
    pub symbol: Option<String>,

    /// Trade time (ms).
    #[serde(rename = "T")]
    pub trade_time_ms: i64,

    #[serde(rename = "p")]
    pub price: String,

    #[serde(rename = "q")]
    pub quantity: String,

    /// Buyer was the maker, i.e. the aggressor sold.
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}

impl AggTrade {
    pub fn parse(raw: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Converts decimal strings to a raw event without validating ranges.
    pub fn to_event(&self) -> Result<TradeEvent, FeedError> {
        Ok(TradeEvent {
            ts_ms: self.trade_time_ms,
            price: self.price.parse()?,
            quantity: self.quantity.parse()?,
            is_sell_initiated: self.buyer_is_maker,
        })
    }
}

impl TryFrom<&AggTrade> for Trade {
    type Error = FeedError;

    fn try_from(agg: &AggTrade) -> Result<Self, Self::Error> {
        Ok(Trade::try_from(agg.to_event()?)?)
    }
}

/// Decodes one payload straight into a validated trade.
pub fn decode_trade(raw: &str) -> Result<Trade, FeedError> {
    Trade::try_from(&AggTrade::parse(raw)?)
}
