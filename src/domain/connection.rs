//! Streaming channel state machine.
//!
//! `Disconnected -> Connecting -> Open -> Disconnected`. There is no automatic
//! reconnect: leaving `Open` hands price refresh to the poll loop until the
//! channel is explicitly started again.

use std::fmt;

/// Lifecycle of the single price socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// An explicit request to open the channel.
    Connect,
    /// The socket handshake completed.
    Opened,
    /// The socket errored or closed.
    Closed,
}

/// Which mechanism keeps displayed prices fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Streaming,
    Polling,
}

impl ConnectionState {
    /// Next state after `transition`. `Connect` is a no-op unless the
    /// channel is `Disconnected`, which makes starting idempotent.
    #[must_use]
    pub const fn next(self, transition: Transition) -> Self {
        match (self, transition) {
            (Self::Disconnected, Transition::Connect) => Self::Connecting,
            (state, Transition::Connect) => state,
            (_, Transition::Opened) => Self::Open,
            (_, Transition::Closed) => Self::Disconnected,
        }
    }

    /// Exactly one refresh mechanism is active in every state.
    pub const fn refresh_mode(self) -> RefreshMode {
        match self {
            Self::Open => RefreshMode::Streaming,
            Self::Disconnected | Self::Connecting => RefreshMode::Polling,
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
        }
    }
}
