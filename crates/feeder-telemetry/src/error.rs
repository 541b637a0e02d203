//! Error types for feeder-telemetry.

use thiserror::Error;

/// Telemetry error types.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Logging init failed: {0}")]
    Init(String),
}

/// Result type alias for telemetry operations.
pub type TelemetryResult<T> = std::result::Result<T, TelemetryError>;
