use std::sync::Arc;

use tracing::info;

use roomstate::config::{Config, Seed};
use roomstate::engine::{local_now, Engine, Repository};
use roomstate::journal::JournaledStore;
use roomstate::jobs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    roomstate::observability::init(config.metrics_port)?;

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;

    let store = Arc::new(JournaledStore::open(&config.journal_path()).await?);
    if let Some(path) = &config.seed {
        Seed::load(path)?.import_into(&*store).await?;
    }

    let repo: Arc<dyn Repository> = store.clone();
    let engine = Arc::new(Engine::new(repo, config.engine_config()));

    info!("roomstate started");
    info!("  journal: {}", config.journal_path().display());
    info!("  reconcile every: {}s", config.reconcile_every.as_secs());
    info!("  cleaning buffer: {} min", engine.config().cleaning_buffer.num_minutes());
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let report = engine.reconcile(local_now()).await?;
    info!(
        "startup reconcile: {} created, {} auto-completed",
        report.created.len(),
        report.auto_completed.len()
    );

    let reconciler = tokio::spawn(jobs::run_reconciler(engine.clone(), config.reconcile_every));
    let compactor = tokio::spawn(jobs::run_compactor(store.clone(), config.compact_threshold));

    // Graceful shutdown on SIGTERM/ctrl-c
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    info!("shutdown signal received, stopping background jobs");
    reconciler.abort();
    compactor.abort();
    let _ = reconciler.await;
    let _ = compactor.await;

    store.compact().await?;
    info!("roomstate stopped");
    Ok(())
}
