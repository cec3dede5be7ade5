//! REST LTP Source - `GET /api/mstock/ltp`
//!
//! One request per batch, keys passed as repeated `i` query parameters.
//! Requests are sent once: retrying a batch is the next poll tick's job.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::cache::PriceMap;
use crate::domain::keys::LookupKey;
use crate::ports::ltp_source::{LtpError, LtpSource};

use super::client::BackendClient;
use super::types::LtpResponse;

/// LTP endpoint path.
pub const LTP_PATH: &str = "/api/mstock/ltp";

/// [`LtpSource`] backed by the dashboard backend.
pub struct RestLtpSource {
  client: Arc<BackendClient>,
}

impl RestLtpSource {
  pub fn new(client: Arc<BackendClient>) -> Self {
    Self { client }
  }
}

/// Repeated `i=<key>` pairs.
pub fn ltp_query(keys: &[LookupKey]) -> Vec<(&str, &str)> {
  keys.iter().map(|key| ("i", key.as_str())).collect()
}

/// Keep the quotes that carry a finite price.
pub fn response_prices(response: LtpResponse) -> Result<PriceMap, LtpError> {
  if !response.is_success() {
    let reason = response
      .message
      .unwrap_or_else(|| format!("status {:?}", response.status));
    return Err(LtpError::Rejected(reason));
  }

  Ok(
    response
      .data
      .unwrap_or_default()
      .into_iter()
      .filter_map(|(key, quote)| {
        quote
          .last_price
          .filter(|price| price.is_finite())
          .map(|price| (LookupKey::new(key), price))
      })
      .collect(),
  )
}

#[async_trait]
impl LtpSource for RestLtpSource {
  #[instrument(skip(self, keys), fields(keys = keys.len()))]
  async fn fetch_ltp(&self, keys: &[LookupKey]) -> Result<PriceMap, LtpError> {
    let request = self.client.get(LTP_PATH, &ltp_query(keys));
    let response = self
      .client
      .send_once(request)
      .await
      .map_err(|e| LtpError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(LtpError::Status(status.as_u16()));
    }

    let body: LtpResponse = response
      .json()
      .await
      .map_err(|e| LtpError::Decode(e.to_string()))?;

    let prices = response_prices(body)?;
    debug!(found = prices.len(), "LTP response");
    Ok(prices)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_query_repeats_i() {
    let keys = vec![LookupKey::from("NSE:SBIN"), LookupKey::from("NFO:NIFTY25JUL24500CE")];
    assert_eq!(ltp_query(&keys), vec![("i", "NSE:SBIN"), ("i", "NFO:NIFTY25JUL24500CE")]);
  }

  #[test]
  fn test_response_prices_skips_missing_quotes() {
    let body: LtpResponse = serde_json::from_str(
      r#"{"status":"success","data":{"NSE:SBIN":{"last_price":812.4},"NSE:GONE":{"last_price":null}}}"#,
    )
    .unwrap();
    let prices = response_prices(body).unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices.get("NSE:SBIN"), Some(&812.4));
  }

  #[test]
  fn test_non_success_is_rejected() {
    let body: LtpResponse = serde_json::from_str(r#"{"status":"error","message":"session expired"}"#).unwrap();
    match response_prices(body) {
      Err(LtpError::Rejected(reason)) => assert_eq!(reason, "session expired"),
      other => panic!("expected rejection, got {other:?}"),
    }
  }

  #[test]
  fn test_success_without_data_is_empty() {
    let body: LtpResponse = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
    assert!(response_prices(body).unwrap().is_empty());
  }
}
