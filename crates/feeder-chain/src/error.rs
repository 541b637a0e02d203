//! Error types for feeder-chain.

use thiserror::Error;

/// Chain cache error types.
#[derive(Debug, Error)]
pub enum ChainError {
    /// No block height has been observed yet, or every refresh since
    /// startup failed.
    #[error("No chain height available (last error: {last_error:?})")]
    NoHeight { last_error: Option<String> },

    #[error("Height query failed: {0}")]
    HeightQuery(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for chain cache operations.
pub type ChainResult<T> = std::result::Result<T, ChainError>;
