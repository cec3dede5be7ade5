//! Row Source Port - Trade Rows Shown on the Dashboard
//!
//! The backend owns trade requests and executions; the dashboard only needs
//! the identifying fields that decide which prices a row displays.

use std::fmt;

use async_trait::async_trait;

use crate::domain::keys::RowIdentity;

/// Dashboard table a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowTable {
    /// Pending trade requests.
    Requests,
    /// Executed trades.
    Executed,
}

impl RowTable {
    pub const ALL: [Self; 2] = [Self::Requests, Self::Executed];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requests => "requests",
            Self::Executed => "executed",
        }
    }
}

impl fmt::Display for RowTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trade row as loaded from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRow {
    /// Backend id, if the row has one.
    pub id: Option<String>,
    /// Fields that determine the row's lookup keys.
    pub identity: RowIdentity,
    /// Broker scrip code, when the backend already knows it.
    pub scrip_code: Option<String>,
}

/// Trait for loading the rows a user's dashboard displays.
#[async_trait]
pub trait RowSource: Send + Sync + 'static {
    /// Load `table` for `user_id`.
    async fn load_rows(&self, user_id: &str, table: RowTable) -> anyhow::Result<Vec<TradeRow>>;
}
