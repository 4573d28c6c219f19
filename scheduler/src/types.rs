//! Shared types used by the scheduler subsystem.

use market::MetricSnapshot;
use serde::{Deserialize, Serialize};

use crate::alert::AlertEvent;

/// What caused a compute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Fixed-cadence timer.
    Timer,
    /// Enough trades accepted since the last tick.
    Size,
    /// Explicit request from the owner of the analyzer.
    Manual,
}

/// Result of one trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A snapshot was computed and handed to the sink.
    Published {
        snapshot: MetricSnapshot,
        alert: Option<AlertEvent>,
    },
    /// The window held fewer trades than required; nothing was published.
    InsufficientData { trades: usize },
    /// Another computation was in flight; this trigger was dropped.
    Coalesced,
}

impl TickOutcome {
    pub fn snapshot(&self) -> Option<&MetricSnapshot> {
        match self {
            TickOutcome::Published { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }
}

/// Everything the analyzer pushes to its sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalyzerEvent {
    Snapshot(MetricSnapshot),
    Alert(AlertEvent),
}

/// Latest published state, swapped in as one value so readers never see a
/// snapshot paired with a stale alert flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrentState {
    pub snapshot: MetricSnapshot,
    pub alert_active: bool,
}
