use crate::buffer::TradeBuffer;
use crate::types::Trade;

pub const DEFAULT_WINDOW_DURATION_MS: u64 = 300_000;

/// Trades newer than `now - duration`, copied out of the buffer.
///
/// Owned by the tick that extracted it and dropped afterwards.
#[derive(Debug, Clone)]
pub struct Window {
    /// Exclusive lower bound used for extraction.
    pub cutoff_ms: i64,
    pub trades: Vec<Trade>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Whether the window holds enough trades to be worth computing.
    pub fn has_at_least(&self, min_trades: usize) -> bool {
        self.trades.len() >= min_trades
    }
}

/// Returns all buffered trades with `ts_ms > now_ms - duration_ms`.
pub fn extract_window(buffer: &TradeBuffer, now_ms: i64, duration_ms: u64) -> Window {
    let duration = i64::try_from(duration_ms).unwrap_or(i64::MAX);
    let cutoff_ms = now_ms.saturating_sub(duration);

    Window {
        cutoff_ms,
        trades: buffer.snapshot_since(cutoff_ms),
    }
}
