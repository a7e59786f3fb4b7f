//! # Refactor scheduler
//! Ticks the registry's `refactor()` on a fixed interval in the
//! background: a `tokio::spawn`'d loop around `tokio::time::interval`,
//! emitting a metric and a log line per tick and never exiting on a bad
//! tick.

use crate::registry::Registry;
use metrics::{counter, gauge};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Spawn the background refactor loop. The handle is returned so callers
/// can abort it on shutdown; dropping it leaves the task running detached.
pub fn spawn_refactor_scheduler(registry: Arc<Registry>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            let ops = registry.refactor();

            counter!("refactor_runs_total").increment(1);
            counter!("refactor_operations_total").increment(ops.len() as u64);
            gauge!("refactor_topic_count").set(registry.snapshot().topic_count as f64);

            tracing::info!(target: "scheduler", ops = ops.len(), "refactor tick");
        }
    })
}
