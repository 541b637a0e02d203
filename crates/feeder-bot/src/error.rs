//! Error types for the feeder application.

use feeder_chain::ChainError;
use feeder_core::CoreError;
use feeder_oracle::OracleError;
use feeder_provider::ProviderError;
use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Result type alias for application operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
