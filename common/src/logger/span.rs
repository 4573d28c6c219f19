use std::future::Future;
use std::time::{Duration, Instant};

use tracing::Span;

use super::TraceId;

/// Root span for one analyzer instance.
pub fn analyzer_span(symbol: &str, trace_id: &TraceId) -> Span {
    tracing::info_span!("analyzer", symbol = %symbol, trace_id = %trace_id)
}

/// Child span for a long-lived task (feed consumer, timer).
pub fn task_span(name: &'static str) -> Span {
    tracing::info_span!("task", name = %name)
}

/// Awaits `fut` and emits a `performance` warning if it took longer than `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn passes_through_the_output() {
        let out = warn_if_slow("noop", Duration::from_secs(1), async { 42 }).await;
        assert_eq!(out, 42);
    }

    #[tokio::test]
    #[traced_test]
    async fn flags_operations_over_budget() {
        warn_if_slow("sleepy", Duration::ZERO, async {
            tokio::time::sleep(Duration::from_millis(2)).await;
        })
        .await;

        assert!(logs_contain("slow operation detected"));
    }
}
