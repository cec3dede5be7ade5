//! Script-Master Resolver - `GET /api/scripts/option`
//!
//! Absent identity fields are left out of the query. Any non-success answer
//! means "unknown to the broker"; the row keeps its placeholder.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::keys::RowIdentity;
use crate::ports::option_resolver::{OptionContract, OptionResolver};

use super::client::BackendClient;
use super::types::option_contract;

/// Script-master lookup path.
pub const OPTION_PATH: &str = "/api/scripts/option";

pub struct BackendOptionResolver {
  client: Arc<BackendClient>,
}

impl BackendOptionResolver {
  pub fn new(client: Arc<BackendClient>) -> Self {
    Self { client }
  }
}

/// Query pairs for `identity`, skipping absent fields.
pub fn option_query(identity: &RowIdentity) -> Vec<(&'static str, &str)> {
  [
    ("exchange", identity.exchange.as_deref()),
    ("instrument", Some(identity.symbol.as_str())),
    ("strikePrice", identity.strike.as_deref()),
    ("optionType", identity.option_type.as_deref()),
    ("expiry", identity.expiry.as_deref()),
  ]
  .into_iter()
  .filter_map(|(name, value)| {
    value
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .map(|v| (name, v))
  })
  .collect()
}

#[async_trait]
impl OptionResolver for BackendOptionResolver {
  async fn resolve(&self, identity: &RowIdentity) -> Result<Option<OptionContract>> {
    let request = self.client.get(OPTION_PATH, &option_query(identity));
    let response = self
      .client
      .send_once(request)
      .await
      .context("Script master request failed")?;

    if !response.status().is_success() {
      debug!(symbol = %identity.symbol, status = %response.status(), "Script master has no match");
      return Ok(None);
    }

    let payload: Value = response
      .json()
      .await
      .context("Invalid script master JSON")?;
    Ok(option_contract(&payload))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_query_omits_absent_fields() {
    let identity = RowIdentity::new("NIFTY")
      .with_exchange("NF")
      .with_strike("24500")
      .with_option_type("CE");
    assert_eq!(
      option_query(&identity),
      vec![
        ("exchange", "NF"),
        ("instrument", "NIFTY"),
        ("strikePrice", "24500"),
        ("optionType", "CE"),
      ]
    );
  }

  #[test]
  fn test_query_full_identity() {
    let identity = RowIdentity::new("BANKNIFTY")
      .with_exchange("BF")
      .with_strike("48000")
      .with_expiry("25JUL")
      .with_option_type("PE");
    let query = option_query(&identity);
    assert_eq!(query.len(), 5);
    assert_eq!(query[4], ("expiry", "25JUL"));
  }
}
