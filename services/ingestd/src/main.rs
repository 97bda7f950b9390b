//! Ingestion service entry point.
//!
//! # Purpose
//! Wires configuration, storage backends, the flusher, and the HTTP router,
//! then starts the API server next to the metrics listener.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup
//! logic. Shutdown stops the flush timer before the final flush so the last
//! buffered readings land in storage.
mod api;
mod app;
mod config;
mod db;
mod flusher;
mod observability;
mod registry;
mod sink;

use acequia_broadcast::ReadingBus;
use anyhow::Context;
use app::{build_router, AppState, RuntimeSettings};
use registry::{ChannelRegistry, MemoryRegistry, PostgresRegistry};
use sink::{MemorySink, PostgresSink, ReadingSink};
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::load().context("load configuration")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: config::Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability();
    let state = build_state(&config).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_addr,
    ));
    let flusher_handle = flusher::spawn(
        Arc::clone(&state.flusher),
        config.flush_interval(),
        config.flush_shutdown_timeout(),
    );

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, storage = ?config.storage, "ingestd listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    tracing::info!("shutting down, flushing buffered readings");
    flusher_handle.shutdown().await;
    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: &config::Config) -> anyhow::Result<AppState> {
    let (registry, sink): (Arc<dyn ChannelRegistry>, Arc<dyn ReadingSink>) = match config.storage {
        config::StorageBackend::Memory => {
            (Arc::new(MemoryRegistry::new()), Arc::new(MemorySink::new()))
        }
        config::StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            let pool = db::connect(pg).await?;
            (
                Arc::new(PostgresRegistry::new(pool.clone())),
                Arc::new(PostgresSink::new(pool)),
            )
        }
    };
    let bus = ReadingBus::new()
        .with_queue_capacity(config.subscriber_queue_capacity)
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(AppState::new(
        registry,
        sink,
        bus,
        RuntimeSettings::from_config(config),
    ))
}
