//! Prometheus metrics and structured logging for the price feeder.
//!
//! The feeder core only emits events; scraping/exposition belongs to the
//! deployment surface. Counters cover:
//! - WebSocket reconnects (tagged by provider)
//! - Inbound provider messages (tagged by provider and kind)
//! - Deviation-filter rejections (tagged by provider, symbol, kind)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
