//! Backend Row Source - Trade Requests and Executions
//!
//! `GET /api/orders/requests?userId=` and `GET /api/orders/executed?userId=`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::ports::rows::{RowSource, RowTable, TradeRow};

use super::client::BackendClient;
use super::types::trade_rows;

/// Path serving `table`.
pub const fn table_path(table: RowTable) -> &'static str {
  match table {
    RowTable::Requests => "/api/orders/requests",
    RowTable::Executed => "/api/orders/executed",
  }
}

pub struct BackendRowSource {
  client: Arc<BackendClient>,
}

impl BackendRowSource {
  pub fn new(client: Arc<BackendClient>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl RowSource for BackendRowSource {
  async fn load_rows(&self, user_id: &str, table: RowTable) -> Result<Vec<TradeRow>> {
    let payload: Value = self
      .client
      .get_json(table_path(table), &[("userId", user_id)])
      .await?;

    if !payload.is_array() {
      debug!(user = %user_id, table = %table, "Rows payload is not an array, treating as empty");
    }
    Ok(trade_rows(&payload))
  }
}
