/**
 * BEAT EXPORTER - Main entry point
 *
 * ROLE: Wires config, beat client, metric collectors and the HTTP surface.
 * The beat identity is fetched once at startup; statistics are fetched on
 * every scrape and never persisted between scrapes.
 */

mod config;
mod fetcher;
mod health;
mod http;
mod metrics;
mod models;
mod state;

use crate::config::load_config;
use crate::fetcher::BeatClient;
use crate::health::HealthTracker;
use crate::http::AppState;
use crate::metrics::Collectors;
use crate::state::SnapshotHandle;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beat_exporter=info")),
        )
        .init();

    let cfg = load_config().await;
    let telemetry_path = cfg
        .listen
        .telemetry_route()
        .context("invalid listen.telemetry_path")?;

    let client = BeatClient::new(&cfg.beat).context("failed to build beat client")?;
    let beat_info = client
        .fetch_info()
        .await
        .with_context(|| format!("failed to fetch beat info from {}", cfg.beat.uri))?;
    info!(
        beat = %beat_info.beat,
        version = %beat_info.version,
        hostname = %beat_info.hostname,
        "connected to beat"
    );


    let collectors = Collectors::new(beat_info, cfg.collector.start_time_policy)
        .context("failed to build metric catalog")?;
    if !collectors.has_filebeat() {
        warn!(
            "beat {} is not filebeat, exporting runtime metrics only",
            collectors.beat_info().beat
        );
    }
    info!(
        sections = ?collectors.sections().collect::<Vec<_>>(),
        "registered {} fixed descriptors",
        collectors.describe(None).len()
    );

    let endpoint = format!("http://{}{}", cfg.listen.address, telemetry_path);
    let app_state = AppState {
        collectors: Arc::new(collectors),
        client,
        snapshot: SnapshotHandle::new(),
        health_tracker: HealthTracker::new(),
        telemetry_path,
    };
    let app = http::build_router(app_state)?;

    let listener = TcpListener::bind(&cfg.listen.address)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen.address))?;
    info!("listening on {endpoint}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await
        .context("server error")?;
    Ok(())
}
