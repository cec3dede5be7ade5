//! Property-Based Tests - Domain Layer Invariants
//!
//! Uses `proptest` to verify that key normalization, the price cache and
//! row rendering keep their invariants across random inputs.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;

use ltp_reconciler::domain::board::{PriceBoard, RowBinding};
use ltp_reconciler::domain::cache::{PriceCache, PriceMap};
use ltp_reconciler::domain::keys::{
    candidate_keys, option_segment, Exchange, LookupKey, RowIdentity, STANDARD_SEGMENTS,
};
use ltp_reconciler::domain::price::{format_price, PLACEHOLDER};
use ltp_reconciler::ports::ltp_source::{LtpError, LtpSource};
use ltp_reconciler::ports::telemetry::NoopTelemetry;
use ltp_reconciler::usecases::fallback::{BatchedFallback, MAX_BATCH_SIZE};

fn symbol() -> impl Strategy<Value = String> {
    "[A-Z]{1,12}"
}

fn known_exchange() -> impl Strategy<Value = Exchange> {
    prop_oneof![
        Just(Exchange::Nf),
        Just(Exchange::Bf),
        Just(Exchange::Nc),
        Just(Exchange::Bc),
    ]
}

fn unknown_exchange() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("  ".to_string())),
        "[A-Z]{3,4}".prop_map(Some),
    ]
    .prop_filter("must not be a known code", |ex| {
        ex.as_deref().and_then(Exchange::parse).is_none()
    })
}

// ── Key Normalizer Properties ───────────────────────────────

proptest! {
    /// Known exchange without strike: underlying key, then the derivatives
    /// key only when the exchange lists derivatives.
    #[test]
    fn known_exchange_keys(exchange in known_exchange(), symbol in symbol(), lower in any::<bool>()) {
        let code = if lower { exchange.code().to_ascii_lowercase() } else { exchange.code().to_string() };
        let keys = candidate_keys(&RowIdentity::new(symbol.clone()).with_exchange(code));

        let mut expected = vec![format!("{}:{symbol}", exchange.underlying_segment())];
        if let Some(segment) = exchange.derivatives_segment() {
            expected.push(format!("{segment}:{symbol}"));
        }
        let actual: Vec<String> = keys.iter().map(ToString::to_string).collect();
        prop_assert_eq!(actual, expected);
    }

    /// Unknown or blank exchange: one key per standard segment, fixed order.
    #[test]
    fn unknown_exchange_keys(exchange in unknown_exchange(), symbol in symbol()) {
        let identity = RowIdentity {
            exchange,
            symbol: symbol.clone(),
            ..RowIdentity::default()
        };
        let keys = candidate_keys(&identity);

        prop_assert_eq!(keys.len(), 4);
        for (key, segment) in keys.iter().zip(STANDARD_SEGMENTS) {
            prop_assert_eq!(key.to_string(), format!("{segment}:{symbol}"));
        }
    }

    /// A strike always appends exactly one option key, last.
    #[test]
    fn strike_appends_option_key_last(
        exchange in prop_oneof![known_exchange().prop_map(|e| Some(e.code().to_string())), unknown_exchange()],
        symbol in symbol(),
        strike in 1u32..100_000,
        expiry in prop::option::of("[0-9]{2}[A-Z]{3}"),
        option_type in prop::option::of(prop_oneof![Just("CE".to_string()), Just("PE".to_string())]),
    ) {
        let base = RowIdentity {
            exchange: exchange.clone(),
            symbol: symbol.clone(),
            ..RowIdentity::default()
        };
        let with_strike = RowIdentity {
            strike: Some(strike.to_string()),
            expiry: expiry.clone(),
            option_type: option_type.clone(),
            ..base.clone()
        };

        let plain = candidate_keys(&base);
        let keys = candidate_keys(&with_strike);
        prop_assert_eq!(keys.len(), plain.len() + 1);
        prop_assert_eq!(&keys[..plain.len()], &plain[..]);

        let expected = format!(
            "{}:{symbol}{}{strike}{}",
            option_segment(exchange.as_deref()),
            expiry.unwrap_or_default(),
            option_type.unwrap_or_default(),
        );
        prop_assert_eq!(keys.last().map(ToString::to_string), Some(expected));
    }
}

// ── Price Cache and Renderer Properties ─────────────────────

fn updates() -> impl Strategy<Value = Vec<Vec<(u8, f64)>>> {
    prop::collection::vec(prop::collection::vec((0u8..8, 0.05f64..50_000.0), 0..10), 1..8)
}

fn key(id: u8) -> LookupKey {
    LookupKey::new(format!("NSE:K{id}"))
}

proptest! {
    /// Last write wins per key; untouched keys keep their value.
    #[test]
    fn cache_is_last_write_wins(batches in updates()) {
        let mut cache = PriceCache::new();
        let mut model = HashMap::new();

        for batch in &batches {
            let touched = cache.merge_all(batch.iter().map(|(id, price)| (key(*id), *price)));
            let expected: HashSet<LookupKey> = batch.iter().map(|(id, _)| key(*id)).collect();
            prop_assert_eq!(touched, expected);
            for (id, price) in batch {
                model.insert(*id, *price);
            }
        }

        prop_assert_eq!(cache.len(), model.len());
        for (id, price) in model {
            prop_assert_eq!(cache.get(key(id).as_str()), Some(price));
        }
    }

    /// Refreshing twice against the same cache never writes the second time,
    /// and every row shows its first cached candidate.
    #[test]
    fn refresh_is_idempotent(batches in updates(), rows in prop::collection::vec(prop::collection::vec(0u8..8, 1..4), 1..6)) {
        let mut cache = PriceCache::new();
        let mut board = PriceBoard::new();
        let bindings: Vec<RowBinding> = rows
            .iter()
            .enumerate()
            .map(|(i, ids)| RowBinding::new(format!("r/{i}"), ids.iter().map(|id| key(*id)).collect()))
            .collect();
        board.replace_scope("r/", bindings, &cache);

        let mut changed = HashSet::new();
        for batch in batches {
            changed.extend(cache.merge_all(batch.into_iter().map(|(id, price)| (key(id), price))));
        }
        board.refresh(&cache, &changed);
        prop_assert!(board.refresh(&cache, &changed).is_empty());

        for (i, ids) in rows.iter().enumerate() {
            let shown = board.row(&format!("r/{i}")).map(|r| r.displayed().to_string());
            let expected = ids
                .iter()
                .find_map(|id| cache.get(key(*id).as_str()))
                .map_or_else(|| PLACEHOLDER.to_string(), format_price);
            prop_assert_eq!(shown, Some(expected));
        }
    }

    /// Finite prices render with two decimals; anything else is the placeholder.
    #[test]
    fn format_price_two_decimals(price in prop::num::f64::ANY) {
        let text = format_price(price);
        if price.is_finite() {
            let (_, decimals) = text.split_once('.').unwrap();
            prop_assert_eq!(decimals.len(), 2);
            let parsed: f64 = text.parse().unwrap();
            prop_assert!((parsed - price).abs() <= 0.005 + price.abs() * 1e-12);
        } else {
            prop_assert_eq!(text, PLACEHOLDER);
        }
    }
}

// ── Batched Fallback Properties ─────────────────────────────

#[derive(Default)]
struct SizeRecorder {
    sizes: Mutex<Vec<usize>>,
}

#[async_trait]
impl LtpSource for SizeRecorder {
    async fn fetch_ltp(&self, keys: &[LookupKey]) -> Result<PriceMap, LtpError> {
        self.sizes.lock().unwrap().push(keys.len());
        Ok(keys.iter().map(|k| (k.clone(), 1.0)).collect())
    }
}

proptest! {
    /// Requests = ceil(n / batch), none larger than the batch size.
    #[test]
    fn batches_are_bounded(n in 0usize..600, batch in 1usize..=MAX_BATCH_SIZE) {
        let source = Arc::new(SizeRecorder::default());
        let fallback = BatchedFallback::new(source.clone(), batch, Arc::new(NoopTelemetry));
        let keys: Vec<LookupKey> = (0..n).map(|i| LookupKey::new(format!("NSE:S{i}"))).collect();

        let prices = tokio_test::block_on(fallback.fetch(&keys));

        let sizes = source.sizes.lock().unwrap().clone();
        prop_assert_eq!(prices.len(), n);
        prop_assert_eq!(sizes.len(), n.div_ceil(batch));
        prop_assert!(sizes.iter().all(|s| *s <= batch && *s > 0));
        prop_assert_eq!(sizes.iter().sum::<usize>(), n);
    }
}
