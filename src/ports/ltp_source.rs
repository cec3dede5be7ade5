//! LTP Source Port - One REST Price Request
//!
//! A single request for a bounded set of lookup keys. Batching, partial
//! results and the decision of *when* to call live in
//! `usecases::fallback`; implementors only perform one round trip.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::cache::PriceMap;
use crate::domain::keys::LookupKey;

/// Failure of a single LTP request. Never surfaced to the user: the batch
/// is skipped and the next poll tick retries.
#[derive(Debug, Error)]
pub enum LtpError {
    /// Connection, timeout or TLS failure.
    #[error("ltp request failed: {0}")]
    Transport(String),
    /// Non-success HTTP status.
    #[error("ltp request returned HTTP {0}")]
    Status(u16),
    /// Backend answered but did not report `status: "success"`.
    #[error("ltp request rejected: {0}")]
    Rejected(String),
    /// Body was not the expected JSON.
    #[error("ltp response malformed: {0}")]
    Decode(String),
}

/// Trait for last-traded-price lookups over REST.
#[async_trait]
pub trait LtpSource: Send + Sync + 'static {
    /// Fetch prices for `keys` in one request. Keys missing from the
    /// backend's answer are simply absent from the returned map.
    async fn fetch_ltp(&self, keys: &[LookupKey]) -> Result<PriceMap, LtpError>;
}
