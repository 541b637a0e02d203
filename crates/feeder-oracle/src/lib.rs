//! Price aggregation engine.
//!
//! Reduces noisy, partial, asynchronously-arriving quotes from many
//! mutually untrusted providers into one robust USD consensus price per
//! asset:
//! - volume-weighted (VWAP) and time-volume-weighted (TVWAP) averaging
//! - cross-provider statistical outlier rejection
//! - single-hop USD cross-rate conversion
//! - the orchestration loop exposing a continuously-refreshed snapshot
//!   plus vote-payload artifacts (salt, exchange-rates string)

pub mod convert;
pub mod deviation;
pub mod error;
pub mod oracle;
pub mod vwap;

pub use convert::{convert_candles_to_usd, convert_tickers_to_usd, ProviderPairs};
pub use deviation::{
    default_deviation_threshold, filter_candle_deviations, filter_ticker_deviations,
};
pub use error::{OracleError, OracleResult};
pub use oracle::{
    generate_exchange_rates_string, generate_salt, Oracle, OracleConfig, DEFAULT_TVWAP_WINDOW,
};
pub use vwap::{compute_tvwap, compute_vwap};
