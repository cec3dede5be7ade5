//! LTP Reconciler - Entry Point
//!
//! Keeps the trading dashboard's price cells current: streams LTPs over
//! the backend WebSocket and falls back to batched REST polling whenever
//! the stream is not open. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config (path from the first CLI argument, default `config.toml`)
//! 2. Init tracing (JSON structured logging)
//! 3. Create metrics registry and in-memory display
//! 4. Create backend client and REST adapters
//! 5. Create price supervisor (cache, rows, channel state, poll loop)
//! 6. Spawn supervisor, health server and dashboard loader
//! 7. Start the LTP stream
//! 8. Wait for SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use ltp_reconciler::adapters::api::{
  BackendClient, BackendClientConfig, BackendOptionResolver, BackendRowSource, RestLtpSource,
};
use ltp_reconciler::adapters::display::MemoryDisplay;
use ltp_reconciler::adapters::feeds::LtpSocket;
use ltp_reconciler::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use ltp_reconciler::config;
use ltp_reconciler::usecases::{BatchedFallback, DashboardLoader, PriceSupervisor};

#[tokio::main]
async fn main() -> Result<()> {
  // ── 1. Load configuration ───────────────────────────────
  let config_path = std::env::args()
    .nth(1)
    .unwrap_or_else(|| config::loader::DEFAULT_CONFIG_PATH.to_string());
  let config = config::loader::load_config(&config_path)
    .context("Failed to load configuration")?;

  // ── 2. Initialize structured JSON logging ───────────────
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
    )
    .json()
    .init();

  info!(
    name = %config.service.name,
    version = env!("CARGO_PKG_VERSION"),
    config = %config_path,
    users = config.dashboard.user_ids.len(),
    "Starting LTP reconciler"
  );

  let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

  // ── 3. Metrics registry and display ─────────────────────
  let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
  let display = Arc::new(MemoryDisplay::new());

  // ── 4. Backend client and REST adapters ─────────────────
  let client = Arc::new(
    BackendClient::new(BackendClientConfig::from(&config.backend))
      .context("Failed to create backend client")?,
  );
  let ltp_source = Arc::new(RestLtpSource::new(Arc::clone(&client)));
  let row_source = Arc::new(BackendRowSource::new(Arc::clone(&client)));
  let resolver = Arc::new(BackendOptionResolver::new(Arc::clone(&client)));
  let socket = Arc::new(LtpSocket::new(config.backend.stream_url()));

  // ── 5. Price supervisor ─────────────────────────────────
  let fallback = Arc::new(BatchedFallback::new(
    ltp_source,
    config.ltp.batch_size,
    metrics.clone(),
  ));
  let (supervisor, prices) = PriceSupervisor::new(
    fallback,
    socket.clone(),
    display.clone(),
    metrics.clone(),
    config.ltp.poll_interval(),
  );

  // ── 6. Spawn tasks ──────────────────────────────────────
  let supervisor_shutdown = shutdown_tx.subscribe();
  let supervisor_handle = tokio::spawn(async move {
    if let Err(e) = supervisor.run(supervisor_shutdown).await {
      error!(error = %e, "Price supervisor failed");
    }
  });

  let health_handle = if config.metrics.enabled {
    let state = HealthState {
      status: prices.subscribe_status(),
      metrics: Arc::clone(&metrics),
      display: Arc::clone(&display),
    };
    let server = HealthServer::new(state, config.metrics.bind_address.clone());
    let health_shutdown = shutdown_tx.subscribe();
    Some(tokio::spawn(async move {
      if let Err(e) = server.run(health_shutdown).await {
        error!(error = %e, "Health server failed");
      }
    }))
  } else {
    None
  };

  let loader = DashboardLoader::new(row_source, resolver, prices.clone());
  let user_ids = config.dashboard.user_ids.clone();
  let reload_every = config.dashboard.reload_interval();
  let loader_shutdown = shutdown_tx.subscribe();
  let loader_handle = tokio::spawn(async move {
    if let Err(e) = loader.run(&user_ids, reload_every, loader_shutdown).await {
      error!(error = %e, "Dashboard loader failed");
    }
  });

  // ── 7. Start the LTP stream ─────────────────────────────
  if config.ltp.start_stream {
    info!(url = %socket.url(), "Starting LTP stream");
    prices.start_channel().await?;
  } else {
    warn!("LTP stream disabled, prices refresh by polling only");
  }

  info!("All tasks spawned, reconciler is running");

  // ── 8. Wait for SIGINT ──────────────────────────────────
  signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
  info!("SIGINT received, initiating graceful shutdown");

  let _ = shutdown_tx.send(());

  let _ = tokio::time::timeout(Duration::from_secs(5), loader_handle).await;
  let _ = tokio::time::timeout(Duration::from_secs(5), supervisor_handle).await;
  if let Some(handle) = health_handle {
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
  }

  let cell_writes = display.write_count();
  info!(cell_writes, "Shutdown complete");
  Ok(())
}
