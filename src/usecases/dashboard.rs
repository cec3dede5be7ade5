//! Dashboard Loader - Rows, Initial Fill and Scrip-Code Resolution
//!
//! For every watched user the loader pulls the trade request and execution
//! tables, binds their rows to candidate keys, asks for an initial batch of
//! prices and finally resolves the rows that are still unpriced through the
//! broker's script master. Every failure degrades to the `-` placeholder.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::domain::board::RowBinding;
use crate::domain::keys::{candidate_keys, option_segment, LookupKey, RowId, RowIdentity};
use crate::ports::option_resolver::OptionResolver;
use crate::ports::rows::{RowSource, RowTable, TradeRow};

use super::supervisor::PriceHandle;

/// Outcome of loading one user's table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Rows bound.
    pub rows: usize,
    /// Rows without a price after the initial fill.
    pub unpriced: usize,
    /// Rows the script master resolved.
    pub resolved: usize,
}

/// Row-id prefix shared by every row of one user's table.
pub fn table_scope(user_id: &str, table: RowTable) -> String {
    format!("{user_id}/{table}/")
}

/// Drop rows whose id was already seen; rows without an id are kept.
pub fn dedupe_rows(rows: Vec<TradeRow>) -> Vec<TradeRow> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|row| row.id.as_ref().is_none_or(|id| seen.insert(id.clone())))
        .collect()
}

/// Bind rows under `scope`, returning bindings and their identities.
fn bind_rows(scope: &str, rows: Vec<TradeRow>) -> (Vec<RowBinding>, HashMap<RowId, RowIdentity>) {
    let mut bindings = Vec::with_capacity(rows.len());
    let mut identities = HashMap::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let id = match &row.id {
            Some(id) => format!("{scope}{id}"),
            None => format!("{scope}#{index}"),
        };
        // rows without a symbol are displayed but never priced
        let candidates = if row.identity.symbol.trim().is_empty() {
            Vec::new()
        } else {
            candidate_keys(&row.identity)
        };
        bindings.push(RowBinding::new(id.clone(), candidates).with_scrip_code(row.scrip_code));
        identities.insert(id, row.identity);
    }

    (bindings, identities)
}

/// Loads dashboard tables and keeps their price cells bound.
pub struct DashboardLoader {
    rows: Arc<dyn RowSource>,
    resolver: Arc<dyn OptionResolver>,
    prices: PriceHandle,
}

impl DashboardLoader {
    pub fn new(rows: Arc<dyn RowSource>, resolver: Arc<dyn OptionResolver>, prices: PriceHandle) -> Self {
        Self {
            rows,
            resolver,
            prices,
        }
    }

    /// Load both tables of one user.
    pub async fn load_user(&self, user_id: &str) -> Result<LoadSummary> {
        let mut total = LoadSummary::default();
        for table in RowTable::ALL {
            match self.load_table(user_id, table).await {
                Ok(summary) => {
                    total.rows += summary.rows;
                    total.unpriced += summary.unpriced;
                    total.resolved += summary.resolved;
                }
                Err(e) => warn!(user = %user_id, table = %table, error = %e, "Failed to load table"),
            }
        }
        Ok(total)
    }

    /// Load one table: bind, initial fill, resolution pass.
    #[instrument(skip(self))]
    pub async fn load_table(&self, user_id: &str, table: RowTable) -> Result<LoadSummary> {
        let rows = dedupe_rows(self.rows.load_rows(user_id, table).await?);
        let scope = table_scope(user_id, table);
        let (bindings, identities) = bind_rows(&scope, rows);

        let mut keys: Vec<LookupKey> = bindings.iter().flat_map(|b| b.candidates.iter().cloned()).collect();
        keys.sort();
        keys.dedup();

        let row_count = bindings.len();
        self.prices.replace_rows(scope.clone(), bindings).await?;

        if !keys.is_empty() {
            let found = self.prices.prices(keys).await?;
            debug!(found = found.len(), "Initial fill");
        }

        let unpriced = self.prices.unpriced_rows(scope.clone()).await?;
        let mut resolved = 0;
        for row in &unpriced {
            let Some(identity) = identities.get(row) else {
                continue;
            };
            if identity.symbol.trim().is_empty() {
                continue;
            }
            match self.resolve_row(row, identity).await {
                Ok(true) => resolved += 1,
                Ok(false) => {}
                Err(e) => debug!(row = %row, error = %e, "Option resolution failed"),
            }
        }

        let summary = LoadSummary {
            rows: row_count,
            unpriced: unpriced.len(),
            resolved,
        };
        info!(user = %user_id, table = %table, rows = summary.rows, unpriced = summary.unpriced, resolved = summary.resolved, "Table loaded");
        Ok(summary)
    }

    /// Look the row up in the script master; on success attach the scrip
    /// code and the `<optionSegment>:<tradingSymbol>` key, then price it.
    async fn resolve_row(&self, row: &RowId, identity: &RowIdentity) -> Result<bool> {
        let Some(contract) = self.resolver.resolve(identity).await? else {
            return Ok(false);
        };
        let key = LookupKey::scoped(&option_segment(identity.exchange_code()), &contract.trading_symbol);

        self.prices
            .attach_resolution(row.clone(), contract.scrip_code, key.clone())
            .await?;
        let price = self.prices.price_or_fallback(key.clone()).await?;
        debug!(row = %row, key = %key, price = ?price, "Row resolved");
        Ok(true)
    }

    /// Load every user once, then again every `reload_every` if set.
    #[instrument(skip(self, user_ids, shutdown_rx))]
    pub async fn run(
        &self,
        user_ids: &[String],
        reload_every: Option<Duration>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        loop {
            for user_id in user_ids {
                self.load_user(user_id).await?;
            }

            let Some(period) = reload_every else {
                info!(users = user_ids.len(), "Dashboard loaded, no reload configured");
                return Ok(());
            };

            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Dashboard loader shutting down");
                    return Ok(());
                }
                () = tokio::time::sleep(period) => {
                    debug!("Reloading dashboard rows");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade_row(id: Option<&str>, symbol: &str) -> TradeRow {
        TradeRow {
            id: id.map(str::to_string),
            identity: RowIdentity::new(symbol).with_exchange("NF"),
            scrip_code: None,
        }
    }

    #[test]
    fn test_dedupe_keeps_rows_without_id() {
        let rows = vec![
            trade_row(Some("1"), "NIFTY"),
            trade_row(Some("1"), "NIFTY"),
            trade_row(None, "SBIN"),
            trade_row(None, "SBIN"),
            trade_row(Some("2"), "TCS"),
        ];
        let kept = dedupe_rows(rows);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn test_bind_rows_ids_and_keys() {
        let scope = table_scope("42", RowTable::Executed);
        assert_eq!(scope, "42/executed/");

        let rows = vec![trade_row(Some("7"), "NIFTY"), trade_row(None, ""), trade_row(None, "SBIN")];
        let (bindings, identities) = bind_rows(&scope, rows);

        assert_eq!(bindings[0].id, "42/executed/7");
        assert_eq!(bindings[0].primary().unwrap().as_str(), "NSE:NIFTY");
        assert_eq!(bindings[1].id, "42/executed/#1");
        assert!(bindings[1].candidates.is_empty());
        assert_eq!(bindings[2].id, "42/executed/#2");
        assert_eq!(identities.len(), 3);
    }
}
