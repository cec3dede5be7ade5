//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces.
//!
//! Use cases:
//! - `PriceSupervisor`: owns cache, rows, channel state and poll loop
//! - `BatchedFallback`: REST prices in batches of at most 90 keys
//! - `DashboardLoader`: row loading, initial fill and scrip-code resolution

pub mod dashboard;
pub mod fallback;
pub mod supervisor;

pub use dashboard::{DashboardLoader, LoadSummary};
pub use fallback::BatchedFallback;
pub use supervisor::{PriceHandle, PriceSupervisor, SupervisorStatus};
