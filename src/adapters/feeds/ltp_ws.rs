//! LTP WebSocket - Streaming Price Channel
//!
//! Connects to the backend's LTP socket and forwards every text frame to the
//! price supervisor unparsed; classification happens on the supervisor task.
//! One session per call, no reconnect: when the socket drops the supervisor
//! falls back to polling.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

use crate::ports::price_channel::{ChannelEvent, PriceChannel};

/// Backend LTP WebSocket.
pub struct LtpSocket {
    /// WebSocket URL.
    ws_url: String,
}

impl LtpSocket {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.ws_url
    }

    /// Stream frames until the socket ends. Returns the close reason, or
    /// `Err(())` when the receiver is gone.
    async fn stream(&self, events: &mpsc::Sender<ChannelEvent>) -> Result<Option<String>, ()> {
        let (ws_stream, _) = match connect_async(self.ws_url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => return Ok(Some(format!("connect failed: {e}"))),
        };
        let (_write, mut read) = ws_stream.split();

        info!(url = %self.ws_url, "LTP WebSocket connected");
        events.send(ChannelEvent::Opened).await.map_err(|_| ())?;

        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    events
                        .send(ChannelEvent::Message(text.to_string()))
                        .await
                        .map_err(|_| ())?;
                }
                Some(Ok(Message::Ping(data))) => {
                    // Pong is handled automatically by tungstenite
                    debug!(len = data.len(), "LTP ping received");
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ok(Some(frame.map_or_else(
                        || "close frame".to_string(),
                        |f| format!("close frame {}: {}", u16::from(f.code), f.reason),
                    )));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Ok(Some(format!("WebSocket error: {e}"))),
                None => return Ok(None),
            }
        }
    }
}

#[async_trait]
impl PriceChannel for LtpSocket {
    #[instrument(skip(self, events), fields(url = %self.ws_url))]
    async fn run_session(&self, events: mpsc::Sender<ChannelEvent>) {
        match self.stream(&events).await {
            Ok(reason) => {
                warn!(reason = reason.as_deref().unwrap_or("stream ended"), "LTP WebSocket closed");
                let _ = events.send(ChannelEvent::Closed { reason }).await;
            }
            Err(()) => debug!("Price supervisor gone, LTP session ends"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_failure_reports_closed() {
        let socket = LtpSocket::new("ws://127.0.0.1:1/ws/ltp");
        let (tx, mut rx) = mpsc::channel(4);

        socket.run_session(tx).await;

        match rx.recv().await {
            Some(ChannelEvent::Closed { reason }) => {
                assert!(reason.unwrap().starts_with("connect failed"));
            }
            other => panic!("expected Closed, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }
}
