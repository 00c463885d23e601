use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::engine::{local_now, Engine};
use crate::journal::JournaledStore;

/// Background task that runs a housekeeping reconcile pass every `period`.
pub async fn run_reconciler(engine: Arc<Engine>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        match engine.reconcile(local_now()).await {
            Ok(report) => debug!(
                "reconcile: {} created, {} auto-completed",
                report.created.len(),
                report.auto_completed.len()
            ),
            // Next tick retries; the pass is idempotent.
            Err(e) => error!("reconcile failed: {e}"),
        }
    }
}

/// Background task that compacts the journal once enough writes pile up.
pub async fn run_compactor(store: Arc<JournaledStore>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        let appends = store.appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match store.compact().await {
            Ok(()) => info!("compacted journal after {appends} appends"),
            Err(e) => error!("journal compaction failed: {e}"),
        }
    }
}
