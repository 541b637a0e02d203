//! Error types for feeder-provider.

use feeder_core::CoreError;
use thiserror::Error;

/// Provider error types.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// None of the requested pairs has cached ticker data.
    #[error("{provider}: no ticker prices for any requested pair")]
    NoTickers { provider: String },

    /// None of the requested pairs has cached candle data.
    #[error("{provider}: no candle prices for any requested pair")]
    NoCandles { provider: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
