//! Backend API Response Types
//!
//! The dashboard backend is loosely typed: the same field shows up under
//! several names and numbers arrive as strings or numbers. Rows and option
//! lookups are therefore read from a JSON object and normalized here.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::feed::scalar_text;
use crate::domain::keys::RowIdentity;
use crate::ports::option_resolver::OptionContract;
use crate::ports::rows::TradeRow;

/// `GET /api/mstock/ltp` response.
#[derive(Debug, Clone, Deserialize)]
pub struct LtpResponse {
  /// `"success"` when `data` is usable.
  #[serde(default)]
  pub status: String,
  /// Key → quote.
  #[serde(default)]
  pub data: Option<HashMap<String, LtpQuote>>,
  /// Error message on failure.
  #[serde(default)]
  pub message: Option<String>,
}

/// One quote inside [`LtpResponse::data`].
#[derive(Debug, Clone, Deserialize)]
pub struct LtpQuote {
  /// Last traded price; absent for unknown instruments.
  #[serde(default)]
  pub last_price: Option<f64>,
}

impl LtpResponse {
  pub fn is_success(&self) -> bool {
    self.status == "success"
  }
}

/// Field aliases, in priority order.
const ID_FIELDS: &[&str] = &["id", "requestId", "request_id"];
const SYMBOL_FIELDS: &[&str] = &["instrument", "symbol", "tradingSymbol"];
const STRIKE_FIELDS: &[&str] = &["strikePrice", "strike"];
const SCRIP_FIELDS: &[&str] = &["scripCode", "scrip_code", "scripCodeStr", "scrip", "tradingScripCode"];

/// First non-empty field among `names`.
fn first_text(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
  names
    .iter()
    .find_map(|name| obj.get(*name).and_then(scalar_text))
}

/// Exchange field; `null`, blank and the literal `"null"` mean unknown.
fn exchange(obj: &Map<String, Value>) -> Option<String> {
  first_text(obj, &["exchange"])
    .filter(|ex| !ex.eq_ignore_ascii_case("null"))
}

/// Normalize one trade request / execution object.
pub fn trade_row(obj: &Map<String, Value>) -> TradeRow {
  let identity = RowIdentity {
    exchange: exchange(obj),
    symbol: first_text(obj, SYMBOL_FIELDS).unwrap_or_default(),
    strike: first_text(obj, STRIKE_FIELDS),
    expiry: first_text(obj, &["expiry"]),
    option_type: first_text(obj, &["optionType"]),
  };

  TradeRow {
    id: first_text(obj, ID_FIELDS),
    identity,
    scrip_code: first_text(obj, SCRIP_FIELDS),
  }
}

/// Normalize a rows payload; anything but an array yields no rows.
pub fn trade_rows(payload: &Value) -> Vec<TradeRow> {
  payload
    .as_array()
    .map(|items| {
      items
        .iter()
        .filter_map(Value::as_object)
        .map(trade_row)
        .collect()
    })
    .unwrap_or_default()
}

/// `GET /api/scripts/option` response; `None` without a trading symbol.
pub fn option_contract(payload: &Value) -> Option<OptionContract> {
  let obj = payload.as_object()?;
  Some(OptionContract {
    trading_symbol: first_text(obj, &["tradingSymbol"])?,
    scrip_code: first_text(obj, &["scripCode", "scrip_code"]),
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_ltp_response_parsing() {
    let body = r#"{"status":"success","data":{"NSE:SBIN":{"last_price":812.4,"instrument_token":3045},"NSE:X":{}}}"#;
    let resp: LtpResponse = serde_json::from_str(body).unwrap();
    assert!(resp.is_success());
    let data = resp.data.unwrap();
    assert_eq!(data["NSE:SBIN"].last_price, Some(812.4));
    assert_eq!(data["NSE:X"].last_price, None);
  }

  #[test]
  fn test_ltp_error_response() {
    let resp: LtpResponse = serde_json::from_str(r#"{"status":"error","message":"token expired"}"#).unwrap();
    assert!(!resp.is_success());
    assert!(resp.data.is_none());
  }

  #[test]
  fn test_trade_row_aliases() {
    let row = json!({
      "requestId": 1187,
      "tradingSymbol": "NIFTY",
      "exchange": "NF",
      "strike": 24500.0,
      "expiry": "25JUL",
      "optionType": "CE",
      "scrip_code": 71234
    });
    let row = trade_row(row.as_object().unwrap());
    assert_eq!(row.id.as_deref(), Some("1187"));
    assert_eq!(row.identity.symbol, "NIFTY");
    assert_eq!(row.identity.strike.as_deref(), Some("24500"));
    assert_eq!(row.scrip_code.as_deref(), Some("71234"));
  }

  #[test]
  fn test_null_exchange_variants() {
    for exchange in [json!(null), json!(""), json!("null"), json!("NULL")] {
      let row = json!({ "id": 1, "instrument": "SBIN", "exchange": exchange });
      assert_eq!(trade_row(row.as_object().unwrap()).identity.exchange, None);
    }
  }

  #[test]
  fn test_primary_alias_wins() {
    let row = json!({ "instrument": "BANKNIFTY", "symbol": "OTHER", "strikePrice": null, "strike": "48000" });
    let row = trade_row(row.as_object().unwrap());
    assert_eq!(row.identity.symbol, "BANKNIFTY");
    assert_eq!(row.identity.strike.as_deref(), Some("48000"));
  }

  #[test]
  fn test_trade_rows_requires_array() {
    assert!(trade_rows(&json!({"error": "nope"})).is_empty());
    assert_eq!(trade_rows(&json!([{"id": 1}, 5, {"id": 2}])).len(), 2);
  }

  #[test]
  fn test_option_contract() {
    let contract = option_contract(&json!({"tradingSymbol": "NIFTY25JUL24500CE", "scripCode": 71234})).unwrap();
    assert_eq!(contract.trading_symbol, "NIFTY25JUL24500CE");
    assert_eq!(contract.scrip_code.as_deref(), Some("71234"));
    assert!(option_contract(&json!({"scripCode": 1})).is_none());
    assert!(option_contract(&json!(null)).is_none());
  }

  #[test]
  fn test_integral_float_scrip_code() {
    let row = json!({ "id": 3, "instrument": "NIFTY", "scripCode": 501.0 });
    assert_eq!(trade_row(row.as_object().unwrap()).scrip_code.as_deref(), Some("501"));
  }
}
