//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use cases require from the
//! outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `LtpSource`: one REST last-traded-price request
//! - `PriceChannel`: streaming price session
//! - `PriceDisplay`: price cell sink
//! - `RowSource`: dashboard trade rows
//! - `OptionResolver`: broker script-master lookup
//! - `PriceTelemetry`: counters for the metrics backend

pub mod display;
pub mod ltp_source;
pub mod option_resolver;
pub mod price_channel;
pub mod rows;
pub mod telemetry;
