//! Backend HTTP Client - Bounded REST Client
//!
//! Wraps reqwest with a concurrency limit, timeouts and retries for the
//! dashboard backend's REST API. LTP batches use [`BackendClient::send_once`]:
//! a failed batch is skipped rather than retried within the same cycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::BackendConfig;

/// Configuration for the backend HTTP client.
#[derive(Debug, Clone)]
pub struct BackendClientConfig {
  /// Base URL of the dashboard backend.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors (lookups only).
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for BackendClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8080".to_string(),
      timeout: Duration::from_secs(10),
      max_concurrent: 4,
      max_retries: 2,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

impl From<&BackendConfig> for BackendClientConfig {
  fn from(config: &BackendConfig) -> Self {
    Self {
      base_url: config.base_url.trim_end_matches('/').to_string(),
      timeout: Duration::from_millis(config.timeout_ms),
      max_concurrent: config.max_concurrent,
      max_retries: config.max_retries,
      retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
    }
  }
}

/// Concurrency-limited HTTP client for the dashboard backend.
pub struct BackendClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: BackendClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
}

impl BackendClient {
  /// Create a new backend client.
  pub fn new(config: BackendClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(config.max_concurrent)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

    Ok(Self {
      http,
      config,
      semaphore,
    })
  }

  /// Absolute URL for a backend path.
  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url, path)
  }

  /// Build a GET request with query parameters.
  pub fn get(&self, path: &str, query: &[(&str, &str)]) -> RequestBuilder {
    self.http.get(self.url(path)).query(query)
  }

  /// Send once, without retries. Any HTTP status is returned as-is.
  pub async fn send_once(&self, request: RequestBuilder) -> reqwest::Result<Response> {
    let _permit = self.semaphore.acquire().await;
    request.send().await
  }

  /// GET a JSON document, retrying transient failures.
  pub async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, &str)],
  ) -> Result<T> {
    let response = self.execute_with_retry(self.get(path, query), path).await?;
    response
      .json::<T>()
      .await
      .with_context(|| format!("Invalid JSON from {path}"))
  }

  /// Execute request with concurrency limit and retries.
  async fn execute_with_retry(
    &self,
    request: RequestBuilder,
    path: &str,
  ) -> Result<Response> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .context("Semaphore closed")?;

    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), path, "Retrying request");
        sleep(delay).await;
      }

      let req = request
        .try_clone()
        .context("Failed to clone request")?;

      match req.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!(path, "Rate limited by backend, backing off");
            last_error = Some(anyhow::anyhow!("Rate limited"));
          }
          status if status.is_server_error() => {
            warn!(status = %status, path, "Server error, retrying");
            last_error = Some(anyhow::anyhow!("Server error: {status}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Backend error {status} on {path}: {body}"));
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, path, "Request failed");
          last_error = Some(e.into());
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_config_from_backend_section_trims_slash() {
    let backend = BackendConfig {
      base_url: "https://dash.example.com/".to_string(),
      ws_url: None,
      timeout_ms: 2500,
      max_concurrent: 3,
      max_retries: 1,
      retry_base_delay_ms: 50,
    };
    let config = BackendClientConfig::from(&backend);
    assert_eq!(config.base_url, "https://dash.example.com");
    assert_eq!(config.timeout, Duration::from_millis(2500));

    let client = BackendClient::new(config).unwrap();
    assert_eq!(client.url("/api/mstock/ltp"), "https://dash.example.com/api/mstock/ltp");
  }
}
