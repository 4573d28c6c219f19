//! Outbound boundary: where snapshots and alerts leave the analyzer.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};

use crate::error::SinkError;
use crate::types::AnalyzerEvent;

/// Consumer of analyzer output (UI bridge, notifier, recorder...).
///
/// Implementations must not block for long: the scheduler awaits `publish`
/// inside its compute cycle.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn publish(&self, event: AnalyzerEvent) -> Result<(), SinkError>;
}

/// Bounded channel sink. Never waits: a full queue drops the event.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: Sender<AnalyzerEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, Receiver<AnalyzerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SnapshotSink for ChannelSink {
    async fn publish(&self, event: AnalyzerEvent) -> Result<(), SinkError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
