//! Health Server - Probes, Metrics and Price Cells
//!
//! One axum 0.7 router on the metrics bind address:
//! - `/live`: 200 while the process runs
//! - `/ready`: 200 while a refresh mechanism is active (stream open or
//!   poll loop armed), 503 otherwise
//! - `/metrics`: Prometheus text exposition
//! - `/rows`: JSON snapshot of every price cell

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, warn};

use crate::adapters::display::MemoryDisplay;
use crate::usecases::supervisor::SupervisorStatus;

use super::prometheus::MetricsRegistry;

/// State shared by all handlers.
#[derive(Clone)]
pub struct HealthState {
    /// Latest supervisor status.
    pub status: watch::Receiver<SupervisorStatus>,
    /// Prometheus registry.
    pub metrics: Arc<MetricsRegistry>,
    /// Price cells.
    pub display: Arc<MemoryDisplay>,
}

impl HealthState {
    /// Ready when exactly one refresh mechanism is running.
    pub fn is_ready(&self) -> bool {
        let status = *self.status.borrow();
        status.connection.is_open() || status.polling
    }
}

pub struct HealthServer {
    state: HealthState,
    bind_address: String,
}

impl HealthServer {
    pub fn new(state: HealthState, bind_address: impl Into<String>) -> Self {
        Self {
            state,
            bind_address: bind_address.into(),
        }
    }

    pub fn router(state: HealthState) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::metrics))
            .route("/rows", get(Self::rows))
            .with_state(state)
    }

    /// Serve until shutdown.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!(address = %self.bind_address, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    async fn metrics(State(state): State<HealthState>) -> impl IntoResponse {
        match state.metrics.encode() {
            Ok(text) => (StatusCode::OK, text),
            Err(e) => {
                warn!(error = %e, "Failed to encode metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        }
    }

    async fn rows(State(state): State<HealthState>) -> Json<BTreeMap<String, String>> {
        Json(state.display.snapshot())
    }
}
