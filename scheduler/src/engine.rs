//! The scheduler engine.
//!
//! For each trigger (timer, size threshold or manual) it:
//!   1. Enters the `Computing` state, or drops the trigger if already there.
//!   2. Extracts the trade window and prunes expired trades from the buffer.
//!   3. Skips the cycle when the window is too thin.
//!   4. Runs the metrics engine on the copied window (no locks held).
//!   5. Records history, evaluates alerts and swaps in the new current state.
//!   6. Hands the snapshot (and any alert) to the sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use common::warn_if_slow;
use market::{Clock, MetricSnapshot, MetricsEngine, TradeBuffer, extract_window};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::alert::{AlertEvaluator, AlertEvent, AlertLog};
use crate::config::AnalyzerConfig;
use crate::history::{FlowSummary, SnapshotHistory};
use crate::metrics::Counters;
use crate::sink::SnapshotSink;
use crate::state::{ComputeGuard, SchedulerState, TickGate};
use crate::types::{AnalyzerEvent, CurrentState, TickOutcome, Trigger};

/// Budget for one metrics computation before it is reported as slow.
const COMPUTE_BUDGET: Duration = Duration::from_millis(50);

pub struct Scheduler {
    cfg: AnalyzerConfig,
    buffer: Arc<TradeBuffer>,
    clock: Arc<dyn Clock>,
    engine: MetricsEngine,
    sink: Arc<dyn SnapshotSink>,
    counters: Counters,

    gate: TickGate,
    /// Only touched while the gate is held.
    alerts: Mutex<AlertEvaluator>,
    alert_log: Mutex<AlertLog>,
    history: SnapshotHistory,
    current: watch::Sender<Option<CurrentState>>,

    /// `buffer.accepted_total()` as of the last published tick.
    size_mark: AtomicU64,
}

impl Scheduler {
    pub fn new(
        cfg: AnalyzerConfig,
        buffer: Arc<TradeBuffer>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn SnapshotSink>,
        counters: Counters,
    ) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            engine: MetricsEngine::new(cfg.engine_config()),
            alerts: Mutex::new(AlertEvaluator::new(cfg.toxicity_alert_threshold)),
            alert_log: Mutex::new(AlertLog::new(cfg.alert_log_capacity)),
            history: SnapshotHistory::new(cfg.history_capacity),
            gate: TickGate::new(),
            size_mark: AtomicU64::new(buffer.accepted_total()),
            current,
            cfg,
            buffer,
            clock,
            sink,
            counters,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.gate.state()
    }

    /// Claims the compute slot without running a cycle.
    ///
    /// Any trigger fired while the returned guard is alive is coalesced.
    pub fn try_begin(&self) -> Option<ComputeGuard<'_>> {
        self.gate.try_begin()
    }

    /// True once `size_trigger_count` trades were accepted since the last published tick.
    pub fn size_trigger_due(&self) -> bool {
        let since = self
            .buffer
            .accepted_total()
            .saturating_sub(self.size_mark.load(Ordering::Acquire));
        since >= self.cfg.size_trigger_count
    }

    /// Runs one compute-and-publish cycle unless one is already running.
    #[instrument(skip(self), target = "scheduler")]
    pub async fn on_trigger(&self, trigger: Trigger) -> TickOutcome {
        let Some(_guard) = self.gate.try_begin() else {
            Counters::bump(&self.counters.ticks_skipped);
            debug!(?trigger, "tick skipped");
            return TickOutcome::Coalesced;
        };

        self.run_cycle().await
    }

    async fn run_cycle(&self) -> TickOutcome {
        let now_ms = self.clock.now_ms();
        let accepted_mark = self.buffer.accepted_total();

        let window = extract_window(&self.buffer, now_ms, self.cfg.window_duration_ms);
        let pruned = self.buffer.prune_through(window.cutoff_ms);

        if !window.has_at_least(self.cfg.min_trades_for_window) {
            Counters::bump(&self.counters.ticks_insufficient);
            debug!(
                trades = window.len(),
                required = self.cfg.min_trades_for_window,
                "window too thin; nothing published"
            );
            return TickOutcome::InsufficientData {
                trades: window.len(),
            };
        }
        self.size_mark.store(accepted_mark, Ordering::Release);

        let metrics = warn_if_slow("compute_metrics", COMPUTE_BUDGET, async {
            self.engine.compute(&window.trades)
        })
        .await;

        // Keep publication order monotonic even if the clock steps back.
        let ts_ms = self.history.last_ts_ms().map_or(now_ms, |last| last.max(now_ms));
        let snapshot = MetricSnapshot::new(ts_ms, &metrics);

        self.history.push(snapshot);
        let (alert, alert_active) = {
            let mut alerts = self.alerts.lock();
            let alert = alerts.evaluate(&snapshot);
            (alert, alerts.is_active())
        };
        self.current.send_replace(Some(CurrentState {
            snapshot,
            alert_active,
        }));

        Counters::bump(&self.counters.ticks_published);
        info!(
            ts_ms,
            trades = window.len(),
            pruned,
            toxicity = snapshot.toxicity,
            imbalance = snapshot.imbalance,
            vpin = snapshot.vpin,
            market_impact = snapshot.market_impact,
            net_flow = snapshot.net_flow,
            "flow snapshot published"
        );

        self.deliver(AnalyzerEvent::Snapshot(snapshot)).await;

        if let Some(alert) = alert {
            self.raise(alert).await;
        }

        TickOutcome::Published { snapshot, alert }
    }

    async fn raise(&self, alert: AlertEvent) {
        Counters::bump(&self.counters.alerts_emitted);
        self.alert_log.lock().record(&alert);
        warn!(level = alert.level, ts_ms = alert.ts_ms, "{}", alert.message());

        self.deliver(AnalyzerEvent::Alert(alert)).await;
    }

    async fn deliver(&self, event: AnalyzerEvent) {
        if let Err(e) = self.sink.publish(event).await {
            Counters::bump(&self.counters.sink_dropped);
            warn!(error = %e, "failed to hand event to sink");
        }
    }

    /// Latest snapshot plus alert flag, if any tick has published.
    pub fn current(&self) -> Option<CurrentState> {
        *self.current.borrow()
    }

    /// Change-notified view of [`current`](Self::current).
    pub fn subscribe(&self) -> watch::Receiver<Option<CurrentState>> {
        self.current.subscribe()
    }

    pub fn history(&self) -> Vec<MetricSnapshot> {
        self.history.to_vec()
    }

    pub fn summary(&self) -> Option<FlowSummary> {
        let recent = self.history.recent(self.cfg.summary_lookback);
        FlowSummary::from_snapshots(&recent, self.cfg.trend_net_flow_threshold)
    }

    /// Alert messages, newest first.
    pub fn recent_alerts(&self) -> Vec<String> {
        self.alert_log.lock().entries()
    }
}
