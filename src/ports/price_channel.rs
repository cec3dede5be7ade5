//! Price Channel Port - Streaming Price Feed
//!
//! One call to [`PriceChannel::run_session`] is one connection attempt.
//! The session reports its lifecycle through [`ChannelEvent`]s and always
//! ends with exactly one `Closed`. Reconnecting is the caller's decision.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Lifecycle and payload events of one streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Handshake completed.
    Opened,
    /// Raw text frame.
    Message(String),
    /// Session ended (error, close frame or connect failure).
    Closed { reason: Option<String> },
}

#[async_trait]
pub trait PriceChannel: Send + Sync + 'static {
    /// Connect and forward events until the session ends or `events`
    /// is dropped.
    async fn run_session(&self, events: mpsc::Sender<ChannelEvent>);
}
