//! Core domain types for the price feeder.
//!
//! This crate provides fundamental types used throughout the feeder:
//! - `CurrencyPair`: base/quote asset pair with canonical symbol form
//! - `Price`, `Volume`: precision-safe non-negative decimal types
//! - `TickerPrice`, `CandlePrice`: per-provider market data samples

pub mod decimal;
pub mod error;
pub mod pair;
pub mod types;

pub use decimal::{Price, Volume};
pub use error::{CoreError, CoreResult};
pub use pair::{CurrencyPair, USD_DENOM};
pub use types::{
    AggregatedCandles, AggregatedPrices, CandlePrice, ProviderName, Symbol, TickerPrice,
};
