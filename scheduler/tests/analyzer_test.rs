use std::sync::Arc;

use market::{Clock, ManualClock, TradeEvent};
use scheduler::{
    Analyzer, AnalyzerConfig, AnalyzerError, AnalyzerEvent, ConfigError, FlowTrend, TickOutcome,
};
use tokio::sync::mpsc;
use tracing_test::traced_test;

const NOW_MS: i64 = 1_700_000_000_000;

fn setup(cfg: AnalyzerConfig) -> (Arc<Analyzer>, mpsc::Receiver<AnalyzerEvent>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW_MS));
    let (analyzer, rx) = Analyzer::with_channel_sink("BTCUSDT", cfg, clock.clone()).unwrap();
    (analyzer, rx, clock)
}

fn event(ts_ms: i64, price: f64, quantity: f64, is_sell_initiated: bool) -> TradeEvent {
    TradeEvent {
        ts_ms,
        price,
        quantity,
        is_sell_initiated,
    }
}

/// Ten trades sharing one timestamp with prices swinging 100 ↔ 200: toxicity saturates at 1.
fn ingest_choppy(analyzer: &Analyzer, ts_ms: i64) {
    for i in 0..10 {
        let price = if i % 2 == 0 { 100.0 } else { 200.0 };
        assert!(analyzer.ingest(event(ts_ms, price, 1.0, i % 2 == 1)));
    }
}

/// Ten evenly spaced trades at a flat price: toxicity 0.
fn ingest_calm(analyzer: &Analyzer, start_ms: i64) {
    for i in 0..10 {
        assert!(analyzer.ingest(event(start_ms + i * 100, 100.0, 1.0, i % 2 == 1)));
    }
}

fn drain(rx: &mut mpsc::Receiver<AnalyzerEvent>) -> Vec<AnalyzerEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test]
async fn five_buys_publish_one_sided_snapshot() {
    let (analyzer, mut rx, _) = setup(AnalyzerConfig::default());
    for i in 0..5 {
        analyzer.ingest(event(NOW_MS - 5_000 + i * 1_000, 100.0, 1.0, false));
    }

    let out = analyzer.tick().await;

    let TickOutcome::Published { snapshot, alert } = out else {
        panic!("expected a published snapshot, got {out:?}");
    };
    assert_eq!(snapshot.ts_ms, NOW_MS);
    assert_eq!(snapshot.imbalance, 1.0);
    assert_eq!(snapshot.net_flow, 500.0);
    assert_eq!(snapshot.buy_volume, 5.0);
    assert_eq!(snapshot.sell_volume, 0.0);
    assert_eq!(snapshot.toxicity, 0.0);
    assert_eq!(snapshot.vpin, 0.5);
    assert!(alert.is_none());

    assert_eq!(drain(&mut rx), vec![AnalyzerEvent::Snapshot(snapshot)]);

    let current = analyzer.current().unwrap();
    assert_eq!(current.snapshot, snapshot);
    assert!(!current.alert_active);
    assert_eq!(analyzer.history(), vec![snapshot]);
}

#[tokio::test]
async fn balanced_even_tape_is_not_toxic() {
    let (analyzer, _rx, _) = setup(AnalyzerConfig::default());
    for i in 0..60 {
        analyzer.ingest(event(NOW_MS - 60_000 + i * 1_000, 100.0, 5.0, i % 2 == 1));
    }

    let snap = *analyzer.tick().await.snapshot().unwrap();

    assert_eq!(snap.toxicity, 0.0);
    assert_eq!(snap.imbalance, 0.0);
    assert_eq!(snap.net_flow, 0.0);
    // 1.2 trades per bucket: every bucket straddles a side change.
    assert!((snap.vpin - 0.4).abs() < 1e-9, "vpin = {}", snap.vpin);
}

#[tokio::test]
async fn block_trade_moves_market_impact() {
    let (analyzer, _rx, _) = setup(AnalyzerConfig::default());
    let start = NOW_MS - 120_000;
    for i in 0..60_i64 {
        let (price, qty) = match i {
            40 => (100.0, 100.0),
            41 => (105.0, 1.0),
            _ => (100.0, 1.0),
        };
        // Tight cluster around the block, otherwise one trade per second.
        let ts = if (38..=42).contains(&i) {
            start + 38_000 + (i - 38) * 10
        } else {
            start + i * 1_000
        };
        analyzer.ingest(event(ts, price, qty, i % 2 == 1));
    }

    let snap = *analyzer.tick().await.snapshot().unwrap();

    assert!((snap.market_impact - 0.05).abs() < 1e-9, "impact = {}", snap.market_impact);
    assert!(snap.toxicity > 0.0);
}

#[tokio::test]
async fn overflowing_notional_publishes_finite_snapshot() {
    let (analyzer, mut rx, _) = setup(AnalyzerConfig::default());
    assert!(analyzer.ingest(event(NOW_MS - 2, 1e200, 1e200, false)));
    assert!(analyzer.ingest(event(NOW_MS - 1, 1e200, 1e200, true)));

    let snap = *analyzer.tick().await.snapshot().unwrap();

    assert!(snap.is_finite(), "{snap:?}");
    assert_eq!(snap.net_flow, 0.0);
    assert_eq!(drain(&mut rx), vec![AnalyzerEvent::Snapshot(snap)]);
}

#[tokio::test]
async fn thin_window_publishes_nothing() {
    let (analyzer, mut rx, _) = setup(AnalyzerConfig::default());
    analyzer.ingest(event(NOW_MS - 1_000, 100.0, 1.0, false));

    let out = analyzer.tick().await;

    assert_eq!(out, TickOutcome::InsufficientData { trades: 1 });
    assert!(analyzer.current().is_none());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(analyzer.counters().snapshot().ticks_insufficient, 1);
}

#[tokio::test]
async fn trades_outside_window_expire() {
    let (analyzer, _rx, clock) = setup(AnalyzerConfig::default());
    for i in 0..5 {
        analyzer.ingest(event(NOW_MS - 1_000 + i, 100.0, 1.0, false));
    }
    clock.advance(300_000);

    let out = analyzer.tick().await;

    assert_eq!(out, TickOutcome::InsufficientData { trades: 0 });
    assert_eq!(analyzer.buffer_len(), 0);
}

#[tokio::test]
#[traced_test]
async fn trigger_during_computation_is_coalesced() {
    let (analyzer, mut rx, _) = setup(AnalyzerConfig::default());
    ingest_calm(&analyzer, NOW_MS - 10_000);

    let guard = analyzer.scheduler().try_begin().unwrap();
    assert_eq!(analyzer.tick().await, TickOutcome::Coalesced);
    drop(guard);

    assert!(logs_contain("tick skipped"));
    assert!(drain(&mut rx).is_empty());
    assert_eq!(analyzer.counters().snapshot().ticks_skipped, 1);

    assert!(matches!(analyzer.tick().await, TickOutcome::Published { .. }));
}

#[tokio::test]
async fn alerts_fire_once_per_elevated_run() {
    let (analyzer, mut rx, clock) = setup(AnalyzerConfig::default());

    ingest_choppy(&analyzer, NOW_MS - 1_000);
    let first = analyzer.tick().await;
    let TickOutcome::Published { snapshot, alert: Some(alert) } = first else {
        panic!("expected an alert, got {first:?}");
    };
    assert_eq!(snapshot.toxicity, 1.0);
    assert_eq!(alert.level, 1.0);
    assert_eq!(alert.ts_ms, NOW_MS);
    assert!(analyzer.current().unwrap().alert_active);

    // Still elevated: no second alert.
    clock.advance(1_000);
    assert!(matches!(
        analyzer.tick().await,
        TickOutcome::Published { alert: None, .. }
    ));

    // Old trades expire, a calm tape re-arms the evaluator.
    clock.advance(400_000);
    ingest_calm(&analyzer, clock.now_ms() - 5_000);
    let calm = analyzer.tick().await;
    assert_eq!(calm.snapshot().unwrap().toxicity, 0.0);
    assert!(!analyzer.current().unwrap().alert_active);

    clock.advance(400_000);
    ingest_choppy(&analyzer, clock.now_ms() - 1_000);
    assert!(matches!(
        analyzer.tick().await,
        TickOutcome::Published { alert: Some(_), .. }
    ));

    let alerts: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|ev| matches!(ev, AnalyzerEvent::Alert(_)))
        .collect();
    assert_eq!(alerts.len(), 2);
    assert_eq!(analyzer.counters().snapshot().alerts_emitted, 2);
    assert_eq!(
        analyzer.recent_alerts(),
        vec![
            "high order-flow toxicity detected: 100.0%".to_string(),
            "high order-flow toxicity detected: 100.0%".to_string(),
        ]
    );
}

#[tokio::test]
async fn snapshots_are_published_in_time_order() {
    let (analyzer, _rx, clock) = setup(AnalyzerConfig::default());
    ingest_calm(&analyzer, NOW_MS - 10_000);

    analyzer.tick().await;
    clock.set(NOW_MS - 500);
    analyzer.tick().await;
    clock.set(NOW_MS + 500);
    analyzer.tick().await;

    let ts: Vec<i64> = analyzer.history().iter().map(|s| s.ts_ms).collect();
    assert_eq!(ts, vec![NOW_MS, NOW_MS, NOW_MS + 500]);
}

#[tokio::test]
async fn history_is_bounded() {
    let cfg = AnalyzerConfig {
        history_capacity: 3,
        ..Default::default()
    };
    let (analyzer, _rx, clock) = setup(cfg);
    ingest_calm(&analyzer, NOW_MS - 10_000);

    for _ in 0..5 {
        analyzer.tick().await;
        clock.advance(1_000);
    }

    let ts: Vec<i64> = analyzer.history().iter().map(|s| s.ts_ms).collect();
    assert_eq!(ts, vec![NOW_MS + 2_000, NOW_MS + 3_000, NOW_MS + 4_000]);
}

#[tokio::test]
async fn summary_reflects_recent_flow() {
    let (analyzer, _rx, _) = setup(AnalyzerConfig::default());
    assert!(analyzer.summary().is_none());

    for i in 0..4 {
        analyzer.ingest(event(NOW_MS - 4_000 + i * 1_000, 100.0, 1.0, i == 3));
    }
    analyzer.tick().await;

    let summary = analyzer.summary().unwrap();
    assert_eq!(summary.net_flow, 200.0);
    assert_eq!(summary.total_volume, 4.0);
    assert_eq!(summary.buy_ratio, 75.0);
    assert_eq!(summary.max_imbalance, 0.5);
    assert_eq!(summary.trend, FlowTrend::Neutral);
}

#[tokio::test]
async fn rejected_trades_are_counted_not_buffered() {
    let (analyzer, _rx, _) = setup(AnalyzerConfig::default());

    assert!(analyzer.ingest(event(NOW_MS, 100.0, 1.0, false)));
    assert!(!analyzer.ingest(event(NOW_MS - 1, 100.0, 1.0, false)));
    assert!(!analyzer.ingest(event(NOW_MS, -1.0, 1.0, false)));
    assert!(!analyzer.ingest(event(NOW_MS, 100.0, f64::NAN, false)));
    assert!(!analyzer.ingest_raw("{not json"));

    let c = analyzer.counters().snapshot();
    assert_eq!(c.trades_accepted, 1);
    assert_eq!(c.trades_stale, 1);
    assert_eq!(c.trades_malformed, 3);
    assert_eq!(c.trades_rejected(), 4);
    assert_eq!(analyzer.buffer_len(), 1);
}

#[tokio::test]
async fn raw_aggtrade_payloads_are_ingested() {
    let (analyzer, _rx, _) = setup(AnalyzerConfig::default());
    let raw = format!(
        r#"{{"e":"aggTrade","s":"BTCUSDT","p":"37000.10","q":"0.015","T":{},"m":true}}"#,
        NOW_MS - 10
    );

    assert!(analyzer.ingest_raw(&raw));
    assert_eq!(analyzer.buffer_len(), 1);
}

#[tokio::test]
async fn capacity_evicts_oldest() {
    let cfg = AnalyzerConfig {
        buffer_capacity: 3,
        ..Default::default()
    };
    let (analyzer, _rx, _) = setup(cfg);
    for i in 0..5 {
        analyzer.ingest(event(NOW_MS - 100 + i, 100.0, 1.0 + i as f64, false));
    }

    assert_eq!(analyzer.buffer_len(), 3);
    assert_eq!(analyzer.counters().snapshot().trades_evicted, 2);

    let snap = *analyzer.tick().await.snapshot().unwrap();
    assert_eq!(snap.buy_volume, 3.0 + 4.0 + 5.0);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = AnalyzerConfig {
        buffer_capacity: 0,
        ..Default::default()
    };
    let clock = Arc::new(ManualClock::new(NOW_MS));

    let err = Analyzer::with_channel_sink("BTCUSDT", cfg, clock).err().unwrap();

    assert!(matches!(
        err,
        AnalyzerError::Config(ConfigError::Zero {
            field: "buffer_capacity"
        })
    ));
}
