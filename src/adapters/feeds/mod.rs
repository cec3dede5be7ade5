//! Price Feed Adapters - Real-time Price Streaming
//!
//! - `ltp_ws`: the backend's LTP WebSocket, implementing `PriceChannel`

pub mod ltp_ws;

pub use ltp_ws::LtpSocket;
