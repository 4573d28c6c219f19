use std::str::FromStr;
use std::time::Duration;

use market::EngineConfig;
use serde::Deserialize;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "FLOW_";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    // =========================
    // Window & buffer
    // =========================
    /// Lookback of the trade window (ms).
    pub window_duration_ms: u64,

    /// Maximum trades retained per instrument. Oldest are evicted first.
    pub buffer_capacity: usize,

    /// Windows with fewer trades skip computation entirely.
    pub min_trades_for_window: usize,

    // =========================
    // Triggers
    // =========================
    /// Timer cadence of the recompute loop (ms).
    pub recompute_interval_ms: u64,

    /// Accepted trades since the last tick that force an early recompute.
    pub size_trigger_count: u64,

    // =========================
    // Metrics
    // =========================
    pub min_trades_for_toxicity: usize,
    pub min_trades_for_vpin: usize,
    pub vpin_bucket_count: usize,

    /// A trade is "large" above this multiple of the mean trade value.
    pub large_trade_multiple: f64,

    // =========================
    // Alerts & outputs
    // =========================
    /// Toxicity above this level raises an alert (edge-triggered).
    pub toxicity_alert_threshold: f64,

    /// Trailing snapshots kept for trend display.
    pub history_capacity: usize,

    /// Human-readable alert messages kept, newest first.
    pub alert_log_capacity: usize,

    /// Snapshots averaged by the flow summary.
    pub summary_lookback: usize,

    /// Mean net flow beyond +-this value marks the trend bullish/bearish.
    pub trend_net_flow_threshold: f64,

    // =========================
    // Queues
    // =========================
    /// Capacity of the feed → analyzer channel.
    pub feed_queue_capacity: usize,

    /// Capacity of the analyzer → sink channel.
    pub sink_queue_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            window_duration_ms: 300_000,
            buffer_capacity: 1_000,
            min_trades_for_window: 2,

            recompute_interval_ms: 5_000,
            size_trigger_count: 100,

            min_trades_for_toxicity: engine.min_trades_for_toxicity,
            min_trades_for_vpin: engine.min_trades_for_vpin,
            vpin_bucket_count: engine.vpin_bucket_count,
            large_trade_multiple: engine.large_trade_multiple,

            toxicity_alert_threshold: 0.7,
            history_capacity: 100,
            alert_log_capacity: 5,
            summary_lookback: 20,
            trend_net_flow_threshold: 1_000_000.0,

            feed_queue_capacity: 1_024,
            sink_queue_capacity: 256,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults overridden by `FLOW_<FIELD>` environment variables,
    /// e.g. `FLOW_WINDOW_DURATION_MS=60000`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let cfg = Self {
            window_duration_ms: read(&lookup, "WINDOW_DURATION_MS", d.window_duration_ms)?,
            buffer_capacity: read(&lookup, "BUFFER_CAPACITY", d.buffer_capacity)?,
            min_trades_for_window: read(&lookup, "MIN_TRADES_FOR_WINDOW", d.min_trades_for_window)?,
            recompute_interval_ms: read(&lookup, "RECOMPUTE_INTERVAL_MS", d.recompute_interval_ms)?,
            size_trigger_count: read(&lookup, "SIZE_TRIGGER_COUNT", d.size_trigger_count)?,
            min_trades_for_toxicity: read(
                &lookup,
                "MIN_TRADES_FOR_TOXICITY",
                d.min_trades_for_toxicity,
            )?,
            min_trades_for_vpin: read(&lookup, "MIN_TRADES_FOR_VPIN", d.min_trades_for_vpin)?,
            vpin_bucket_count: read(&lookup, "VPIN_BUCKET_COUNT", d.vpin_bucket_count)?,
            large_trade_multiple: read(&lookup, "LARGE_TRADE_MULTIPLE", d.large_trade_multiple)?,
            toxicity_alert_threshold: read(
                &lookup,
                "TOXICITY_ALERT_THRESHOLD",
                d.toxicity_alert_threshold,
            )?,
            history_capacity: read(&lookup, "HISTORY_CAPACITY", d.history_capacity)?,
            alert_log_capacity: read(&lookup, "ALERT_LOG_CAPACITY", d.alert_log_capacity)?,
            summary_lookback: read(&lookup, "SUMMARY_LOOKBACK", d.summary_lookback)?,
            trend_net_flow_threshold: read(
                &lookup,
                "TREND_NET_FLOW_THRESHOLD",
                d.trend_net_flow_threshold,
            )?,
            feed_queue_capacity: read(&lookup, "FEED_QUEUE_CAPACITY", d.feed_queue_capacity)?,
            sink_queue_capacity: read(&lookup, "SINK_QUEUE_CAPACITY", d.sink_queue_capacity)?,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("window_duration_ms", self.window_duration_ms == 0),
            ("buffer_capacity", self.buffer_capacity == 0),
            ("recompute_interval_ms", self.recompute_interval_ms == 0),
            ("size_trigger_count", self.size_trigger_count == 0),
            ("vpin_bucket_count", self.vpin_bucket_count == 0),
            ("history_capacity", self.history_capacity == 0),
            ("summary_lookback", self.summary_lookback == 0),
            ("feed_queue_capacity", self.feed_queue_capacity == 0),
            ("sink_queue_capacity", self.sink_queue_capacity == 0),
        ];
        if let Some(&(field, _)) = non_zero.iter().find(|(_, zero)| *zero) {
            return Err(ConfigError::Zero { field });
        }

        let t = self.toxicity_alert_threshold;
        if !(0.0..=1.0).contains(&t) {
            return Err(ConfigError::OutOfUnitRange {
                field: "toxicity_alert_threshold",
                value: t,
            });
        }

        for (field, value) in [
            ("large_trade_multiple", self.large_trade_multiple),
            ("trend_net_flow_threshold", self.trend_net_flow_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_trades_for_toxicity: self.min_trades_for_toxicity,
            min_trades_for_vpin: self.min_trades_for_vpin,
            vpin_bucket_count: self.vpin_bucket_count,
            large_trade_multiple: self.large_trade_multiple,
        }
    }

    pub fn recompute_interval(&self) -> Duration {
        Duration::from_millis(self.recompute_interval_ms)
    }
}

fn read<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let key = format!("{ENV_PREFIX}{name}");
    match lookup(&key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value: raw }),
    }
}
