//! Metrics and Monitoring Adapters
//!
//! Prometheus metrics plus the axum 0.7 server exposing `/live`, `/ready`,
//! `/metrics` and `/rows` on the configured bind address.

pub mod health;
pub mod prometheus;

pub use health::{HealthServer, HealthState};
pub use prometheus::MetricsRegistry;
