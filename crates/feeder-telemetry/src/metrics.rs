//! Prometheus metrics for the price feeder.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_int_gauge, CounterVec, IntGauge};

/// Data kind label for ticker samples.
pub const KIND_TICKER: &str = "ticker";
/// Data kind label for candle samples.
pub const KIND_CANDLE: &str = "candle";

/// Total WebSocket reconnect events, by provider.
pub static WS_RECONNECTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "feeder_ws_reconnects_total",
        "Total WebSocket reconnect events",
        &["provider"]
    )
    .unwrap()
});

/// Total inbound market data messages, by provider and kind.
pub static PROVIDER_MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "feeder_provider_messages_total",
        "Total inbound market data messages",
        &["provider", "kind"]
    )
    .unwrap()
});

/// Total quotes rejected by the cross-provider deviation filter.
pub static DEVIATION_REJECTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "feeder_deviation_rejects_total",
        "Total quotes rejected by the deviation filter",
        &["provider", "symbol", "kind"]
    )
    .unwrap()
});

/// Unix timestamp of the last successful price sync cycle.
pub static LAST_PRICE_SYNC: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "feeder_last_price_sync_timestamp_seconds",
        "Unix timestamp of the last successful price sync"
    )
    .unwrap()
});

/// Record a reconnect event for a provider stream.
pub fn record_reconnect(provider: &str) {
    WS_RECONNECTS_TOTAL.with_label_values(&[provider]).inc();
}

/// Record one inbound message of the given kind for a provider.
pub fn record_message(provider: &str, kind: &str) {
    PROVIDER_MESSAGES_TOTAL
        .with_label_values(&[provider, kind])
        .inc();
}

/// Record a quote filtered out by the deviation filter.
pub fn record_deviation_reject(provider: &str, symbol: &str, kind: &str) {
    DEVIATION_REJECTS_TOTAL
        .with_label_values(&[provider, symbol, kind])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_register_once() {
        record_reconnect("binance");
        record_reconnect("binance");
        record_message("kraken", KIND_TICKER);
        record_deviation_reject("osmosis", "ATOMUSDT", KIND_CANDLE);

        assert!(WS_RECONNECTS_TOTAL.with_label_values(&["binance"]).get() >= 2.0);
    }
}
