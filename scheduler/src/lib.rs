//! Scheduling, alerting and publication for the trade-flow analyzer.
//!
//! An [`Analyzer`] owns one instrument's trade buffer and drives the
//! [`Scheduler`] from a recompute timer, a trade-count trigger or manual
//! ticks. Snapshots and alerts leave through a [`SnapshotSink`].

pub mod alert;
pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;
pub mod sink;
pub mod state;
pub mod types;

pub use alert::{AlertEvaluator, AlertEvent, AlertLog};
pub use analyzer::{Analyzer, feed_channel};
pub use config::AnalyzerConfig;
pub use engine::Scheduler;
pub use error::{AnalyzerError, ConfigError, SinkError};
pub use history::{FlowSummary, FlowTrend, SnapshotHistory};
pub use metrics::{CounterSnapshot, Counters};
pub use sink::{ChannelSink, SnapshotSink};
pub use state::{ComputeGuard, SchedulerState, TickGate};
pub use types::{AnalyzerEvent, CurrentState, TickOutcome, Trigger};
