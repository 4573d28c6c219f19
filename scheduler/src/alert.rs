//! Edge-triggered toxicity alerts.
//!
//! An alert fires on the transition into `toxicity > threshold`. While the
//! run stays elevated no further alerts fire; dropping back to or below the
//! threshold re-arms the evaluator.

use std::collections::VecDeque;

use market::MetricSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Toxicity at the moment of crossing.
    pub level: f64,
    /// Timestamp of the snapshot that crossed (ms).
    pub ts_ms: i64,
}

impl AlertEvent {
    pub fn message(&self) -> String {
        format!(
            "high order-flow toxicity detected: {:.1}%",
            self.level * 100.0
        )
    }
}

#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    threshold: f64,
    active: bool,
}

impl AlertEvaluator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn evaluate(&mut self, snapshot: &MetricSnapshot) -> Option<AlertEvent> {
        self.observe(snapshot.toxicity, snapshot.ts_ms)
    }

    fn observe(&mut self, toxicity: f64, ts_ms: i64) -> Option<AlertEvent> {
        if toxicity > self.threshold {
            if self.active {
                return None;
            }
            self.active = true;
            Some(AlertEvent {
                level: toxicity,
                ts_ms,
            })
        } else {
            self.active = false;
            None
        }
    }
}

/// Most recent alert messages, newest first.
#[derive(Debug, Clone)]
pub struct AlertLog {
    capacity: usize,
    entries: VecDeque<String>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, alert: &AlertEvent) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_front(alert.message());
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fires_once_per_elevated_run() {
        let mut ev = AlertEvaluator::new(0.7);
        let fired: Vec<AlertEvent> = [0.5, 0.8, 0.9, 0.6, 0.85]
            .iter()
            .enumerate()
            .filter_map(|(i, &tox)| ev.observe(tox, i as i64))
            .collect();

        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].level, 0.8);
        assert_eq!(fired[0].ts_ms, 1);
        assert_eq!(fired[1].level, 0.85);
        assert_eq!(fired[1].ts_ms, 4);
    }

    #[test]
    fn threshold_itself_is_not_elevated() {
        let mut ev = AlertEvaluator::new(0.7);
        assert!(ev.observe(0.7, 0).is_none());
        assert!(!ev.is_active());
    }

    #[test]
    fn touching_threshold_rearms() {
        let mut ev = AlertEvaluator::new(0.7);
        assert!(ev.observe(0.75, 0).is_some());
        assert!(ev.observe(0.7, 1).is_none());
        assert!(ev.observe(0.71, 2).is_some());
    }

    #[test]
    fn message_is_percentage() {
        let a = AlertEvent {
            level: 0.8532,
            ts_ms: 0,
        };
        assert_eq!(a.message(), "high order-flow toxicity detected: 85.3%");
    }

    #[test]
    fn log_keeps_newest_first_and_bounded() {
        let mut log = AlertLog::new(2);
        for (i, level) in [0.71, 0.8, 0.95].into_iter().enumerate() {
            log.record(&AlertEvent {
                level,
                ts_ms: i as i64,
            });
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ends_with("95.0%"));
        assert!(entries[1].ends_with("80.0%"));
    }

    proptest! {
        #[test]
        fn one_alert_per_rising_edge(series in proptest::collection::vec(0.0f64..=1.0, 0..64)) {
            let threshold = 0.7;
            let mut ev = AlertEvaluator::new(threshold);
            let fired = series
                .iter()
                .enumerate()
                .filter(|(i, tox)| ev.observe(**tox, *i as i64).is_some())
                .count();

            let mut prev_elevated = false;
            let mut edges = 0;
            for &tox in &series {
                let elevated = tox > threshold;
                if elevated && !prev_elevated {
                    edges += 1;
                }
                prev_elevated = elevated;
            }

            prop_assert_eq!(fired, edges);
        }
    }
}
