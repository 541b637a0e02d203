//! Error types for feeder-oracle.

use feeder_core::CoreError;
use feeder_provider::ProviderError;
use thiserror::Error;

/// Oracle error types.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Total reported volume for a symbol is zero; there is no
    /// meaningful weight to divide by.
    #[error("No volume reported for {0}; cannot compute weighted average")]
    ZeroVolume(String),

    #[error("Decimal overflow aggregating {0}")]
    Overflow(String),

    /// No provider quotes the needed currency directly against USD, or
    /// the providers that do yielded zero usable samples.
    #[error("No USD conversion rate for {0}")]
    NoConversionRate(String),

    #[error("Salt length must be positive")]
    InvalidSaltLength,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for oracle operations.
pub type OracleResult<T> = std::result::Result<T, OracleError>;
