//! Per-instrument analyzer runtime.
//!
//! Data flow:
//! feed channel → ingest → TradeBuffer → (timer | size trigger | manual) → Scheduler → sink
//!
//! Lifecycle: `new` → `start` → `shutdown`. One instance per instrument; instances
//! share nothing. Background tasks hold only a weak handle, so dropping the last
//! `Arc<Analyzer>` without `shutdown` also stops them.

use std::sync::{Arc, Weak};
use std::time::Duration;

use common::{TraceId, analyzer_span, task_span};
use market::feed::decode_trade;
use market::{Clock, MetricSnapshot, Trade, TradeBuffer, TradeEvent};
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, Span, debug, info};

use crate::config::AnalyzerConfig;
use crate::engine::Scheduler;
use crate::error::AnalyzerError;
use crate::history::FlowSummary;
use crate::metrics::Counters;
use crate::sink::{ChannelSink, SnapshotSink};
use crate::state::SchedulerState;
use crate::types::{AnalyzerEvent, CurrentState, TickOutcome, Trigger};

/// Bounded channel a feed adapter pushes trade events into.
pub fn feed_channel(cfg: &AnalyzerConfig) -> (mpsc::Sender<TradeEvent>, mpsc::Receiver<TradeEvent>) {
    mpsc::channel(cfg.feed_queue_capacity.max(1))
}

struct Runtime {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct Analyzer {
    symbol: String,
    cfg: AnalyzerConfig,
    trace_id: TraceId,
    span: Span,

    buffer: Arc<TradeBuffer>,
    scheduler: Scheduler,
    counters: Counters,

    /// Wakes the size-trigger task.
    size_signal: Arc<Notify>,
    runtime: Mutex<Option<Runtime>>,
}

impl Analyzer {
    pub fn new(
        symbol: impl Into<String>,
        cfg: AnalyzerConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<Arc<Self>, AnalyzerError> {
        cfg.validate()?;

        let symbol = symbol.into();
        let trace_id = TraceId::new();
        let span = analyzer_span(&symbol, &trace_id);
        let buffer = Arc::new(TradeBuffer::new(cfg.buffer_capacity));
        let counters = Counters::default();
        let scheduler = Scheduler::new(
            cfg.clone(),
            Arc::clone(&buffer),
            clock,
            sink,
            counters.clone(),
        );

        Ok(Arc::new(Self {
            symbol,
            cfg,
            trace_id,
            span,
            buffer,
            scheduler,
            counters,
            size_signal: Arc::new(Notify::new()),
            runtime: Mutex::new(None),
        }))
    }

    /// Analyzer publishing into a bounded [`ChannelSink`] sized by `sink_queue_capacity`.
    pub fn with_channel_sink(
        symbol: impl Into<String>,
        cfg: AnalyzerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<(Arc<Self>, mpsc::Receiver<AnalyzerEvent>), AnalyzerError> {
        let (sink, rx) = ChannelSink::new(cfg.sink_queue_capacity);
        let analyzer = Self::new(symbol, cfg, clock, Arc::new(sink))?;
        Ok((analyzer, rx))
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.cfg
    }

    // =========================
    // Ingestion
    // =========================

    /// Validates and buffers one trade event. Returns whether it was accepted.
    ///
    /// Rejected events are counted and dropped; nothing is reported back to the feed.
    pub fn ingest(&self, event: TradeEvent) -> bool {
        match Trade::try_from(event) {
            Ok(trade) => self.ingest_trade(trade),
            Err(e) => {
                Counters::bump(&self.counters.trades_malformed);
                debug!(parent: &self.span, error = %e, "trade dropped");
                false
            }
        }
    }

    /// Decodes a raw Binance aggTrade payload and buffers it.
    pub fn ingest_raw(&self, raw: &str) -> bool {
        match decode_trade(raw) {
            Ok(trade) => self.ingest_trade(trade),
            Err(e) => {
                Counters::bump(&self.counters.trades_malformed);
                debug!(parent: &self.span, error = %e, "payload dropped");
                false
            }
        }
    }

    pub fn ingest_trade(&self, trade: Trade) -> bool {
        match self.buffer.ingest(trade) {
            Ok(outcome) => {
                Counters::bump(&self.counters.trades_accepted);
                Counters::add(&self.counters.trades_evicted, outcome.evicted as u64);
                debug!(
                    parent: &self.span,
                    ts_ms = trade.ts_ms(),
                    price = trade.price(),
                    quantity = trade.quantity(),
                    sell = trade.is_sell_initiated(),
                    buffered = outcome.len,
                    "trade accepted"
                );

                if self.scheduler.size_trigger_due() {
                    self.size_signal.notify_one();
                }
                true
            }
            Err(e) => {
                if e.is_stale() {
                    Counters::bump(&self.counters.trades_stale);
                } else {
                    Counters::bump(&self.counters.trades_malformed);
                }
                debug!(parent: &self.span, error = %e, "trade dropped");
                false
            }
        }
    }

    // =========================
    // Lifecycle
    // =========================

    /// Spawns the feed consumer, the recompute timer and the size-trigger task.
    pub fn start(self: &Arc<Self>, feed_rx: mpsc::Receiver<TradeEvent>) -> Result<(), AnalyzerError> {
        let mut runtime = self.runtime.lock();
        if runtime.is_some() {
            return Err(AnalyzerError::AlreadyRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(
                Self::run_feed(Arc::downgrade(self), feed_rx, shutdown_rx.clone())
                    .instrument(self.child_span("feed")),
            ),
            tokio::spawn(
                Self::run_timer(
                    Arc::downgrade(self),
                    self.cfg.recompute_interval(),
                    shutdown_rx.clone(),
                )
                .instrument(self.child_span("timer")),
            ),
            tokio::spawn(
                Self::run_size_trigger(
                    Arc::downgrade(self),
                    Arc::clone(&self.size_signal),
                    shutdown_rx,
                )
                .instrument(self.child_span("size_trigger")),
            ),
        ];

        *runtime = Some(Runtime { shutdown_tx, tasks });
        info!(
            parent: &self.span,
            every_ms = self.cfg.recompute_interval_ms,
            window_ms = self.cfg.window_duration_ms,
            "analyzer started"
        );
        Ok(())
    }

    /// Cancels the timer and feed tasks, waits for an in-flight tick to
    /// finish, then clears the buffer.
    pub async fn shutdown(&self) -> Result<(), AnalyzerError> {
        let runtime = self.runtime.lock().take().ok_or(AnalyzerError::NotRunning)?;

        let _ = runtime.shutdown_tx.send(true);

        let mut failure = None;
        for task in runtime.tasks {
            if let Err(e) = task.await {
                failure.get_or_insert(e);
            }
        }

        self.buffer.clear();
        info!(parent: &self.span, "analyzer stopped");

        match failure {
            Some(e) => Err(AnalyzerError::Task(e)),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.runtime.lock().is_some()
    }

    /// Runs one cycle now, subject to the same coalescing as timer ticks.
    pub async fn tick(&self) -> TickOutcome {
        self.trigger(Trigger::Manual).await
    }

    async fn trigger(&self, trigger: Trigger) -> TickOutcome {
        self.scheduler
            .on_trigger(trigger)
            .instrument(self.span.clone())
            .await
    }

    fn child_span(&self, name: &'static str) -> Span {
        self.span.in_scope(|| task_span(name))
    }

    // Each loop exits on the shutdown signal, or once the analyzer is dropped
    // (the watch sender goes with it and `changed()` errors).

    async fn run_feed(
        this: Weak<Self>,
        mut feed_rx: mpsc::Receiver<TradeEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("feed consumer running");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                event = feed_rx.recv() => {
                    let Some(event) = event else {
                        info!("feed closed");
                        break;
                    };
                    let Some(analyzer) = this.upgrade() else { break };
                    analyzer.ingest(event);
                }
            }
        }
    }

    async fn run_timer(this: Weak<Self>, every: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            let Some(analyzer) = this.upgrade() else { break };
            analyzer.scheduler.on_trigger(Trigger::Timer).await;
        }
    }

    async fn run_size_trigger(
        this: Weak<Self>,
        signal: Arc<Notify>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = signal.notified() => {}
            }
            let Some(analyzer) = this.upgrade() else { break };
            analyzer.scheduler.on_trigger(Trigger::Size).await;
        }
    }

    // =========================
    // Read side
    // =========================

    pub fn current(&self) -> Option<CurrentState> {
        self.scheduler.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CurrentState>> {
        self.scheduler.subscribe()
    }

    pub fn history(&self) -> Vec<MetricSnapshot> {
        self.scheduler.history()
    }

    pub fn summary(&self) -> Option<FlowSummary> {
        self.scheduler.summary()
    }

    pub fn recent_alerts(&self) -> Vec<String> {
        self.scheduler.recent_alerts()
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Direct access to the tick engine, mainly for holding the compute slot in tests.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
