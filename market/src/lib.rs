//! Trade-tape primitives and the pure flow metrics computed over them.
//!
//! Data flow inside this crate:
//! `TradeEvent` → `Trade` (validated) → `TradeBuffer` → `Window` → `MetricsEngine` → `FlowMetrics`
//!
//! Nothing here spawns tasks or talks to the network; scheduling and publishing
//! live in the `scheduler` crate.

pub mod buffer;
pub mod clock;
pub mod engine;
pub mod error;
pub mod feed;
pub mod pulse;
pub mod types;
pub mod window;

pub use buffer::{IngestOutcome, TradeBuffer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineConfig, FlowMetrics, MetricsEngine};
pub use error::{FeedError, TradeError};
pub use types::{MetricSnapshot, Trade, TradeEvent};
pub use window::{Window, extract_window};
