//! Domain layer - Core price reconciliation logic and models.
//!
//! Pure logic for the live price subsystem: lookup-key normalization, the
//! price cache, feed payload classification, the channel state machine and
//! row rendering. No I/O here (hexagonal architecture inner ring); every
//! type is testable in isolation.

pub mod board;
pub mod cache;
pub mod connection;
pub mod feed;
pub mod keys;
pub mod price;

// Re-export core types for convenience
pub use board::{CellWrite, PriceBoard, RowBinding};
pub use cache::{PriceCache, PriceMap};
pub use connection::{ConnectionState, RefreshMode, Transition};
pub use feed::{classify, classify_text, FeedError, FeedShape, FeedUpdate};
pub use keys::{candidate_keys, option_segment, Exchange, LookupKey, RowId, RowIdentity};
pub use price::{format_price, PLACEHOLDER};
