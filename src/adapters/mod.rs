//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP, WebSocket, in-memory display).
//!
//! Adapter categories:
//! - `api`: dashboard backend REST client, LTP, rows and script master
//! - `display`: in-memory price cells
//! - `feeds`: LTP WebSocket
//! - `metrics`: Prometheus metrics and health endpoints

pub mod api;
pub mod display;
pub mod feeds;
pub mod metrics;
