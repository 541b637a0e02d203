//! Provider capability contract and shared adapter plumbing.
//!
//! Every exchange adapter implements the [`Provider`] trait and keeps its
//! cached market data in a [`ProviderStore`]; the rest of the feeder reads
//! quotes only through the contract, never through exchange-specific
//! protocols. Adapters are constructed by name through the
//! [`ProviderRegistry`].

pub mod error;
pub mod provider;
pub mod registry;
pub mod store;

pub use error::{ProviderError, ProviderResult};
pub use provider::Provider;
pub use registry::{ProviderCtor, ProviderRegistry};
pub use store::{ProviderStore, DEFAULT_CANDLE_WINDOW};
