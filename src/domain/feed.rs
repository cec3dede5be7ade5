//! Feed Message Classification
//!
//! The price socket is semi-trusted and emits four disjoint payload shapes:
//!
//! | shape          | example                                              |
//! |----------------|------------------------------------------------------|
//! | scrip tick     | `{"scripCode": 501, "ltp": 123.45}`                  |
//! | single tick    | `{"i": "NFO:NIFTY", "last_price": 12.3}`             |
//! | batch map      | `{"data": {"NFO:NIFTY": {"last_price": 12.3}}}`      |
//! | tick array     | `[{"i": "NFO:NIFTY", "last_price": 12.3}, ...]`      |
//!
//! Classification is first-match-wins in that order and produces a
//! normalized [`FeedUpdate`] before anything touches the cache.

use serde_json::{Map, Value};
use thiserror::Error;

use super::cache::PriceMap;
use super::keys::LookupKey;

/// Which payload shape a message matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedShape {
    ScripTick,
    SingleTick,
    BatchMap,
    TickArray,
}

impl FeedShape {
    /// Stable label for logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScripTick => "scrip_tick",
            Self::SingleTick => "single_tick",
            Self::BatchMap => "batch_map",
            Self::TickArray => "tick_array",
        }
    }
}

/// Normalized update produced from one feed message.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    /// Tick addressed by broker scrip code; bypasses the price cache.
    /// `price` is `None` when the payload's price is not numeric.
    ScripTick { scrip_code: String, price: Option<f64> },
    /// Key-addressed prices to merge into the cache.
    Prices(PriceMap),
}

/// Why a feed message was dropped.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid feed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized feed payload")]
    Unrecognized,
}

/// Parse and classify a raw text frame.
pub fn classify_text(text: &str) -> Result<(FeedShape, FeedUpdate), FeedError> {
    let value: Value = serde_json::from_str(text)?;
    classify(&value).ok_or(FeedError::Unrecognized)
}

/// Classify an already-parsed payload. `None` means unrecognized.
pub fn classify(value: &Value) -> Option<(FeedShape, FeedUpdate)> {
    match value {
        Value::Object(obj) => classify_object(obj),
        Value::Array(items) => {
            let prices = items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(single_tick)
                .collect();
            Some((FeedShape::TickArray, FeedUpdate::Prices(prices)))
        }
        _ => None,
    }
}

fn classify_object(obj: &Map<String, Value>) -> Option<(FeedShape, FeedUpdate)> {
    if let Some(scrip_code) = obj.get("scripCode").and_then(scrip_code_text) {
        let price = present(obj.get("ltp")).or_else(|| present(obj.get("last_price")));
        if let Some(price) = price {
            return Some((
                FeedShape::ScripTick,
                FeedUpdate::ScripTick {
                    scrip_code,
                    price: number(price),
                },
            ));
        }
    }

    if let Some((key, price)) = single_tick(obj) {
        return Some((
            FeedShape::SingleTick,
            FeedUpdate::Prices(PriceMap::from([(key, price)])),
        ));
    }

    if let Some(Value::Object(data)) = obj.get("data") {
        let prices = data
            .iter()
            .filter_map(|(key, entry)| {
                let price = match entry {
                    Value::Object(quote) => present(quote.get("last_price")).and_then(number),
                    other => number(other),
                }?;
                Some((LookupKey::new(key.as_str()), price))
            })
            .collect();
        return Some((FeedShape::BatchMap, FeedUpdate::Prices(prices)));
    }

    None
}

/// `{ "i": <key>, "last_price": <number> }`
fn single_tick(obj: &Map<String, Value>) -> Option<(LookupKey, f64)> {
    let key = obj.get("i")?.as_str().filter(|k| !k.is_empty())?;
    let price = present(obj.get("last_price")).and_then(number)?;
    Some((LookupKey::new(key), price))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Numeric value, accepting numeric strings.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|price| price.is_finite())
}

/// Render a scalar JSON value as text. Integral floats drop the fraction
/// (`24500.0` → `"24500"`). Null, blank strings and containers are `None`.
///
/// Row annotations and socket ticks both go through this, so a scrip code
/// sent as `501.0` on one side still matches `501` on the other.
#[allow(clippy::cast_possible_truncation)]
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => {
            if n.is_f64() {
                let f = n.as_f64()?;
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    return Some((f as i64).to_string());
                }
            }
            Some(n.to_string())
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Scrip codes are compared as strings against row annotations.
fn scrip_code_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(_) | Value::String(_) => scalar_text(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(update: FeedUpdate) -> PriceMap {
        match update {
            FeedUpdate::Prices(map) => map,
            FeedUpdate::ScripTick { .. } => panic!("expected key-addressed prices"),
        }
    }

    #[test]
    fn test_scrip_tick() {
        let (shape, update) = classify_text(r#"{"scripCode": 501, "ltp": 123.45}"#).unwrap();
        assert_eq!(shape, FeedShape::ScripTick);
        assert_eq!(
            update,
            FeedUpdate::ScripTick {
                scrip_code: "501".to_string(),
                price: Some(123.45),
            }
        );
    }

    #[test]
    fn test_scrip_tick_integral_float_code() {
        let (_, update) = classify_text(r#"{"scripCode": 501.0, "ltp": 10}"#).unwrap();
        assert_eq!(
            update,
            FeedUpdate::ScripTick {
                scrip_code: "501".to_string(),
                price: Some(10.0),
            }
        );
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&serde_json::json!(24500.5)).as_deref(), Some("24500.5"));
        assert_eq!(scalar_text(&serde_json::json!(71234.0)).as_deref(), Some("71234"));
        assert_eq!(scalar_text(&serde_json::json!(" 7 ")).as_deref(), Some("7"));
        assert_eq!(scalar_text(&serde_json::json!("  ")), None);
        assert_eq!(scalar_text(&serde_json::json!([1])), None);
    }

    #[test]
    fn test_scrip_tick_falls_back_to_last_price() {
        let (_, update) = classify_text(r#"{"scripCode": "77", "ltp": null, "last_price": 9.5}"#).unwrap();
        assert_eq!(
            update,
            FeedUpdate::ScripTick {
                scrip_code: "77".to_string(),
                price: Some(9.5),
            }
        );
    }

    #[test]
    fn test_scrip_tick_with_garbage_price_keeps_shape() {
        let (shape, update) = classify_text(r#"{"scripCode": 12, "ltp": "n/a"}"#).unwrap();
        assert_eq!(shape, FeedShape::ScripTick);
        assert_eq!(
            update,
            FeedUpdate::ScripTick {
                scrip_code: "12".to_string(),
                price: None,
            }
        );
    }

    #[test]
    fn test_scrip_code_without_price_is_not_a_scrip_tick() {
        let err = classify_text(r#"{"scripCode": 12}"#).unwrap_err();
        assert!(matches!(err, FeedError::Unrecognized));
    }

    #[test]
    fn test_single_tick() {
        let (shape, update) = classify_text(r#"{"i": "NFO:NIFTY", "last_price": 12.34}"#).unwrap();
        assert_eq!(shape, FeedShape::SingleTick);
        assert_eq!(prices(update).get("NFO:NIFTY"), Some(&12.34));
    }

    #[test]
    fn test_batch_map() {
        let text = r#"{"status":"success","data":{"NSE:A":{"last_price":10},"NSE:B":{"last_price":20.5},"NSE:C":{}}}"#;
        let (shape, update) = classify_text(text).unwrap();
        assert_eq!(shape, FeedShape::BatchMap);
        let map = prices(update);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("NSE:A"), Some(&10.0));
        assert_eq!(map.get("NSE:B"), Some(&20.5));
    }

    #[test]
    fn test_tick_array_skips_bad_items() {
        let text = r#"[{"i":"NSE:A","last_price":1},{"i":"","last_price":2},{"last_price":3},7,{"i":"NSE:B","last_price":"4.5"}]"#;
        let (shape, update) = classify_text(text).unwrap();
        assert_eq!(shape, FeedShape::TickArray);
        let map = prices(update);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("NSE:B"), Some(&4.5));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(classify_text("not json"), Err(FeedError::Json(_))));
        for text in ["null", "42", r#""hello""#, r#"{"type":"heartbeat"}"#, r#"{"data":[1,2]}"#] {
            assert!(
                matches!(classify_text(text), Err(FeedError::Unrecognized)),
                "{text} should be unrecognized"
            );
        }
    }
}
