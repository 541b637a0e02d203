//! Price feeder application wiring.
//!
//! Ties validated configuration, the provider registry, the aggregation
//! oracle and the chain caches into one supervised refresh loop. The
//! voting client consuming the published snapshot lives outside this
//! process boundary.

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, PairConfig};
pub use error::{AppError, AppResult};
