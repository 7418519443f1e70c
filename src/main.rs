use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tracing::{info, warn};

use pizza_metrics::config::Config;
use pizza_metrics::metrics::{Exporter, MetricsCollector};
use pizza_metrics::{server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Logging ───────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pizza_metrics=debug".into()),
        )
        .init();

    // ── 2. Configuration ─────────────────────────────────────────
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PIZZA_METRICS_CONFIG").ok())
        .map(PathBuf::from);
    let config = Config::load(path.as_deref()).context("loading configuration")?;
    info!(listen = %config.listen_addr, metrics = ?config.metrics, "configuration loaded");

    // ── 3. Aggregator + exporter ─────────────────────────────────
    let collector = Arc::new(MetricsCollector::new());

    let exporter = if config.metrics.export_enabled() {
        let exporter = Exporter::new(collector.clone(), &config.metrics)
            .context("building metrics exporter")?;
        Some(exporter.start_periodic_reporting(config.metrics.period()))
    } else {
        warn!("no metrics url configured, periodic export disabled");
        None
    };

    // ── 4. Router ────────────────────────────────────────────────
    let state = Arc::new(AppState::new(collector));
    let app = server::create_router(state, Router::new());

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!("metrics report → http://{}/metrics", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    // ── 6. Stop the timer; in-flight pushes are abandoned ────────
    if let Some(handle) = exporter {
        handle.shutdown().await;
    }
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
