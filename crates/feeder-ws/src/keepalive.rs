//! Keep-alive tracking for stream connections.
//!
//! Two halves: outbound pings of a configured frame type when the venue
//! expects them, and an inbound staleness deadline that forces a
//! reconnect when the socket goes quiet. Heartbeats that require a
//! payload reply (e.g. echoing an id) are the message handler's job,
//! not the controller's.

use std::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::Message;

/// The frame a venue expects as a keep-alive ping.
#[derive(Debug, Clone)]
pub enum PingFrame {
    /// Protocol-level WebSocket ping.
    Ping,
    /// Exchange-specific text frame, e.g. `{"op":"ping"}`.
    Text(String),
}

impl PingFrame {
    pub fn to_message(&self) -> Message {
        match self {
            Self::Ping => Message::Ping(Vec::new()),
            Self::Text(text) => Message::Text(text.clone()),
        }
    }
}

/// Outbound ping policy for a connection.
#[derive(Debug, Clone)]
pub struct PingSpec {
    pub interval: Duration,
    pub frame: PingFrame,
}

/// Connection-local keep-alive state, owned by the read loop.
#[derive(Debug)]
pub struct Keepalive {
    stale_after: Duration,
    last_inbound: Instant,
    last_ping: Option<Instant>,
}

impl Keepalive {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            last_inbound: Instant::now(),
            last_ping: None,
        }
    }

    /// Record that any inbound frame arrived.
    pub fn record_inbound(&mut self) {
        self.last_inbound = Instant::now();
    }

    /// Record that a ping was sent.
    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
    }

    /// Whether the socket has gone quiet past the staleness deadline.
    pub fn is_stale(&self) -> bool {
        self.last_inbound.elapsed() > self.stale_after
    }

    /// Whether the next ping is due.
    pub fn should_ping(&self, interval: Duration) -> bool {
        match self.last_ping {
            None => true,
            Some(sent) => sent.elapsed() >= interval,
        }
    }
}
