//! Option Resolver Port - Broker Scrip-Code Lookup
//!
//! Used for rows that found no price under any candidate key: the broker's
//! script master is asked for the exact trading symbol and scrip code.

use async_trait::async_trait;

use crate::domain::keys::RowIdentity;

/// Instrument resolved by the broker's script master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionContract {
    /// Exact broker trading symbol.
    pub trading_symbol: String,
    /// Broker scrip code, if the master has one.
    pub scrip_code: Option<String>,
}

/// Trait for resolving a row's instrument to a broker contract.
#[async_trait]
pub trait OptionResolver: Send + Sync + 'static {
    /// `Ok(None)` when the instrument is unknown to the broker.
    async fn resolve(&self, identity: &RowIdentity) -> anyhow::Result<Option<OptionContract>>;
}
