use std::net::SocketAddr;

// ── Query metrics ───────────────────────────────────────────────

/// Counter: availability and search queries answered.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "roomstate_availability_queries_total";

/// Counter: stay quotes computed.
pub const QUOTES_TOTAL: &str = "roomstate_quotes_total";

/// Counter: single-unit status lookups. Labels: status.
pub const UNIT_STATUS_LOOKUPS_TOTAL: &str = "roomstate_unit_status_lookups_total";

// ── Housekeeping metrics ────────────────────────────────────────

/// Counter: reconciliation passes run.
pub const RECONCILE_PASSES_TOTAL: &str = "roomstate_reconcile_passes_total";

/// Histogram: reconciliation pass duration in seconds.
pub const RECONCILE_DURATION_SECONDS: &str = "roomstate_reconcile_duration_seconds";

/// Counter: cleaning tasks created by reconciliation.
pub const TASKS_CREATED_TOTAL: &str = "roomstate_tasks_created_total";

/// Counter: tasks closed because their cleaning window elapsed.
pub const TASKS_AUTO_COMPLETED_TOTAL: &str = "roomstate_tasks_auto_completed_total";

/// Counter: malformed units skipped during reconciliation.
pub const RECONCILE_SKIPPED_UNITS_TOTAL: &str = "roomstate_reconcile_skipped_units_total";

// ── Journal metrics ─────────────────────────────────────────────

/// Histogram: journal append + fsync duration in seconds.
pub const JOURNAL_APPEND_DURATION_SECONDS: &str = "roomstate_journal_append_duration_seconds";

/// Counter: journal compactions completed.
pub const JOURNAL_COMPACTIONS_TOTAL: &str = "roomstate_journal_compactions_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
