//! Resilient WebSocket stream controller for exchange data sources.
//!
//! Provides the generic connect/subscribe/read/reconnect machinery every
//! streaming provider reuses:
//! - Automatic reconnection on a fixed retry tick
//! - Full resubscription of the live subscription set after reconnect
//! - Configurable keep-alive pings and inbound staleness detection
//! - A multi-socket variant for venues with multiplexing limits

pub mod controller;
pub mod error;
pub mod keepalive;

pub use controller::{
    MessageHandler, MultiStreamController, StreamConfig, StreamController, StreamState,
};
pub use error::{WsError, WsResult};
pub use keepalive::{Keepalive, PingFrame, PingSpec};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
