//! Dashboard Backend REST Adapters
//!
//! HTTP client and port implementations for the dashboard backend.
//!
//! Sub-modules:
//! - `client`: reqwest client with concurrency limit and retries
//! - `ltp`: batched last-traded-price requests (`LtpSource`)
//! - `options`: broker script-master lookups (`OptionResolver`)
//! - `rows`: trade requests and executions (`RowSource`)
//! - `types`: response types and field normalization

pub mod client;
pub mod ltp;
pub mod options;
pub mod rows;
pub mod types;

pub use client::{BackendClient, BackendClientConfig};
pub use ltp::RestLtpSource;
pub use options::BackendOptionResolver;
pub use rows::BackendRowSource;
