//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Backend
//! endpoints, batch sizing and poll cadence live here; nothing is
//! hardcoded in the domain layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

/// Top-level service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  pub service: ServiceConfig,
  /// Dashboard backend endpoints.
  pub backend: BackendConfig,
  /// Price refresh parameters.
  #[serde(default)]
  pub ltp: LtpConfig,
  /// Watched dashboards.
  #[serde(default)]
  pub dashboard: DashboardConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Dashboard backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// REST base URL.
  pub base_url: String,
  /// LTP WebSocket URL; derived from `base_url` when absent.
  #[serde(default)]
  pub ws_url: Option<String>,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout")]
  pub timeout_ms: u64,
  /// Maximum concurrent requests.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Retries for row and script-master lookups.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base retry delay in milliseconds.
  #[serde(default = "default_retry_delay")]
  pub retry_base_delay_ms: u64,
}

impl BackendConfig {
  /// WebSocket URL: `ws_url`, or `base_url` with `http` → `ws` plus `/ws/ltp`.
  pub fn stream_url(&self) -> String {
    if let Some(url) = self.ws_url.as_deref().filter(|u| !u.trim().is_empty()) {
      return url.to_string();
    }
    let base = self.base_url.trim_end_matches('/');
    let base = base
      .strip_prefix("https://")
      .map(|rest| format!("wss://{rest}"))
      .or_else(|| base.strip_prefix("http://").map(|rest| format!("ws://{rest}")))
      .unwrap_or_else(|| base.to_string());
    format!("{base}/ws/ltp")
  }
}

/// Price refresh configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LtpConfig {
  /// Keys per REST request (at most 90).
  #[serde(default = "default_batch_size")]
  pub batch_size: usize,
  /// Poll period while the stream is down.
  #[serde(default = "default_poll_interval")]
  pub poll_interval_secs: u64,
  /// Open the WebSocket at startup.
  #[serde(default = "default_true")]
  pub start_stream: bool,
}

impl LtpConfig {
  pub const fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }
}

impl Default for LtpConfig {
  fn default() -> Self {
    Self {
      batch_size: default_batch_size(),
      poll_interval_secs: default_poll_interval(),
      start_stream: true,
    }
  }
}

/// Watched dashboards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardConfig {
  /// Users whose tables are loaded.
  #[serde(default)]
  pub user_ids: Vec<String>,
  /// Reload rows periodically when set.
  #[serde(default)]
  pub reload_interval_secs: Option<u64>,
}

impl DashboardConfig {
  pub fn reload_interval(&self) -> Option<Duration> {
    self
      .reload_interval_secs
      .filter(|secs| *secs > 0)
      .map(Duration::from_secs)
  }
}

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Whether to serve metrics and health endpoints.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address.
  #[serde(default = "default_metrics_bind")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_bind(),
    }
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_timeout() -> u64 {
  10_000
}

fn default_max_concurrent() -> usize {
  4
}

fn default_max_retries() -> u32 {
  2
}

fn default_retry_delay() -> u64 {
  200
}

fn default_batch_size() -> usize {
  90
}

fn default_poll_interval() -> u64 {
  5
}

fn default_metrics_bind() -> String {
  "0.0.0.0:9090".to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn backend(base_url: &str, ws_url: Option<&str>) -> BackendConfig {
    BackendConfig {
      base_url: base_url.to_string(),
      ws_url: ws_url.map(str::to_string),
      timeout_ms: default_timeout(),
      max_concurrent: 4,
      max_retries: 2,
      retry_base_delay_ms: 200,
    }
  }

  #[test]
  fn test_stream_url_derivation() {
    assert_eq!(backend("https://dash.example.com/", None).stream_url(), "wss://dash.example.com/ws/ltp");
    assert_eq!(backend("http://localhost:8080", None).stream_url(), "ws://localhost:8080/ws/ltp");
    assert_eq!(
      backend("http://localhost:8080", Some("ws://feed:9000/ltp")).stream_url(),
      "ws://feed:9000/ltp"
    );
  }

  #[test]
  fn test_reload_interval_zero_disables() {
    let dashboard = DashboardConfig {
      user_ids: vec![],
      reload_interval_secs: Some(0),
    };
    assert_eq!(dashboard.reload_interval(), None);
  }
}
