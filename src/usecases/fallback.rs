//! Batched REST Fallback - Prices Without the Stream
//!
//! Splits a key set into fixed-size batches (90 keys per request keeps the
//! query string within backend limits) and issues them sequentially.
//! A failed batch is skipped: its keys stay absent and the next poll tick
//! retries them. Partial results are always returned.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::cache::PriceMap;
use crate::domain::keys::LookupKey;
use crate::ports::ltp_source::LtpSource;
use crate::ports::telemetry::PriceTelemetry;

/// Upper bound on keys per LTP request.
pub const MAX_BATCH_SIZE: usize = 90;

/// Sequential, failure-tolerant batch fetcher over an [`LtpSource`].
pub struct BatchedFallback {
    /// One-request LTP source.
    source: Arc<dyn LtpSource>,
    /// Keys per request.
    batch_size: usize,
    /// Request outcome counters.
    telemetry: Arc<dyn PriceTelemetry>,
}

impl BatchedFallback {
    /// Create a fallback. `batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(
        source: Arc<dyn LtpSource>,
        batch_size: usize,
        telemetry: Arc<dyn PriceTelemetry>,
    ) -> Self {
        Self {
            source,
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            telemetry,
        }
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fetch prices for `keys`, deduplicated in first-seen order.
    pub async fn fetch(&self, keys: &[LookupKey]) -> PriceMap {
        let mut seen = HashSet::with_capacity(keys.len());
        let unique: Vec<LookupKey> = keys
            .iter()
            .filter(|key| seen.insert(key.as_str()))
            .cloned()
            .collect();

        let mut prices = PriceMap::with_capacity(unique.len());
        if unique.is_empty() {
            return prices;
        }

        let batches = unique.len().div_ceil(self.batch_size);
        for (index, batch) in unique.chunks(self.batch_size).enumerate() {
            match self.source.fetch_ltp(batch).await {
                Ok(found) => {
                    debug!(batch = index, requested = batch.len(), found = found.len(), "LTP batch fetched");
                    self.telemetry.fallback_request(true);
                    prices.extend(found);
                }
                Err(e) => {
                    warn!(error = %e, batch = index, batches, keys = batch.len(), "LTP batch failed, skipping");
                    self.telemetry.fallback_request(false);
                }
            }
        }

        prices
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::ports::ltp_source::LtpError;
    use crate::ports::telemetry::NoopTelemetry;

    /// Records batch sizes and fails the batches listed in `fail`.
    struct RecordingSource {
        calls: Mutex<Vec<usize>>,
        fail: Vec<usize>,
    }

    #[async_trait]
    impl LtpSource for RecordingSource {
        async fn fetch_ltp(&self, keys: &[LookupKey]) -> Result<PriceMap, LtpError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(keys.len());
                calls.len() - 1
            };
            if self.fail.contains(&call) {
                return Err(LtpError::Status(502));
            }
            Ok(keys.iter().map(|k| (k.clone(), 1.0)).collect())
        }
    }

    fn keys(n: usize) -> Vec<LookupKey> {
        (0..n).map(|i| LookupKey::new(format!("NSE:SYM{i}"))).collect()
    }

    fn fallback(fail: Vec<usize>) -> (Arc<RecordingSource>, BatchedFallback) {
        let source = Arc::new(RecordingSource {
            calls: Mutex::new(Vec::new()),
            fail,
        });
        let fallback = BatchedFallback::new(source.clone(), MAX_BATCH_SIZE, Arc::new(NoopTelemetry));
        (source, fallback)
    }

    #[tokio::test]
    async fn test_two_hundred_keys_make_three_requests() {
        let (source, fallback) = fallback(vec![]);
        let prices = fallback.fetch(&keys(200)).await;

        assert_eq!(*source.calls.lock().unwrap(), vec![90, 90, 20]);
        assert_eq!(prices.len(), 200);
    }

    #[tokio::test]
    async fn test_failed_batch_is_skipped() {
        let (source, fallback) = fallback(vec![1]);
        let prices = fallback.fetch(&keys(200)).await;

        assert_eq!(source.calls.lock().unwrap().len(), 3);
        assert_eq!(prices.len(), 110);
        assert!(prices.contains_key("NSE:SYM0"));
        assert!(!prices.contains_key("NSE:SYM90"));
        assert!(prices.contains_key("NSE:SYM199"));
    }

    #[tokio::test]
    async fn test_duplicates_and_empty_input() {
        let (source, fallback) = fallback(vec![]);
        assert!(fallback.fetch(&[]).await.is_empty());
        assert!(source.calls.lock().unwrap().is_empty());

        let dup = vec![LookupKey::from("NSE:A"), LookupKey::from("NSE:A")];
        assert_eq!(fallback.fetch(&dup).await.len(), 1);
        assert_eq!(*source.calls.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let (source, _) = fallback(vec![]);
        let big = BatchedFallback::new(source.clone(), 500, Arc::new(NoopTelemetry));
        let zero = BatchedFallback::new(source, 0, Arc::new(NoopTelemetry));
        assert_eq!(big.batch_size(), MAX_BATCH_SIZE);
        assert_eq!(zero.batch_size(), 1);
    }
}
