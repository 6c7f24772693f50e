//! Process entry point: loads configuration, wires up the cache actor,
//! event log, durability worker and promoter, and serves the HTTP gateway.
//!
//! Wiring-level errors use `anyhow`, matching how the teacher reserves
//! `anyhow` for `main.rs`/binary-level code and `thiserror` inside library
//! modules.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;

use ticketgate::config::AppConfig;
use ticketgate::core_types::TicketId;
use ticketgate::durability::{DurabilityWorker, PostgresStore, PurchaseStore};
use ticketgate::gateway::{self, AppState};
use ticketgate::logging;
use ticketgate::promoter::Promoter;
use ticketgate::service::PurchaseService;
use ticketgate::{cache, eventlog};

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init_logging();

    let config = load_config().context("loading configuration")?;
    let ticket = TicketId::from(config.ticket.name.clone());

    let cache = cache::spawn();
    cache
        .init_stock(&ticket, config.ticket.initial_stock)
        .await
        .map_err(|err| anyhow::anyhow!("failed to seed initial stock: {err}"))?;
    let eventlog = eventlog::spawn();

    let pg_store = PostgresStore::connect(&config.database.url, config.database.max_connections)
        .await
        .context("connecting to Postgres")?;
    pg_store
        .ensure_schema()
        .await
        .context("ensuring purchases schema exists")?;
    let store: Arc<dyn PurchaseStore> = Arc::new(pg_store);

    let service = Arc::new(PurchaseService::new(
        cache.clone(),
        eventlog.clone(),
        ticket,
        config.ticket.max_active,
    ));

    let durability = Arc::new(DurabilityWorker::new(
        Arc::clone(&store),
        eventlog.clone(),
        Duration::from_millis(config.service.save_pacing_ms),
        config.service.max_retries,
        Duration::from_millis(config.service.retry_delay_ms),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let promoter = Promoter::new(
        cache.clone(),
        config.ticket.max_active,
        Duration::from_millis(config.service.promote_interval_ms),
    );
    let promoter_shutdown = shutdown_rx.clone();
    tokio::spawn(async move { promoter.run(promoter_shutdown).await });

    let durability_for_worker = Arc::clone(&durability);
    let durability_shutdown = shutdown_rx.clone();
    tokio::spawn(async move { durability_for_worker.run(durability_shutdown).await });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let dlq_idle_timeout = Duration::from_millis(config.service.dlq_idle_ms);
    let state = AppState::new(cache, service, durability, store, dlq_idle_timeout);

    gateway::run_server(&config.service.bind_addr, state)
        .await
        .context("gateway server error")?;

    Ok(())
}

/// Prefers a YAML file at `TICKETGATE_CONFIG_PATH` if set, falling back to
/// plain environment variables for container-style deployment.
fn load_config() -> Result<AppConfig> {
    match std::env::var("TICKETGATE_CONFIG_PATH") {
        Ok(path) => {
            AppConfig::from_file(&path).with_context(|| format!("reading config file {path}"))
        }
        Err(_) => AppConfig::from_env().context("reading config from environment"),
    }
}
