//! Name-keyed provider constructor registry.
//!
//! Exchange adapters register a constructor under their configuration
//! name; the application builds live providers from validated config
//! without knowing any adapter type.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::Provider;
use feeder_core::CurrencyPair;
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for one adapter: receives the pairs assigned to it.
pub type ProviderCtor =
    Arc<dyn Fn(&[CurrencyPair]) -> ProviderResult<Arc<dyn Provider>> + Send + Sync>;

/// Registry of available adapters.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    ctors: HashMap<String, ProviderCtor>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under a provider name. Later registrations
    /// replace earlier ones.
    pub fn register(&mut self, name: impl Into<String>, ctor: ProviderCtor) {
        self.ctors.insert(name.into(), ctor);
    }

    /// Build a live provider for `name` with its assigned pairs.
    pub fn build(&self, name: &str, pairs: &[CurrencyPair]) -> ProviderResult<Arc<dyn Provider>> {
        let ctor = self
            .ctors
            .get(name)
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))?;
        ctor(pairs)
    }

    /// Whether a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.ctors.contains_key(name)
    }

    /// Registered provider names.
    pub fn names(&self) -> Vec<String> {
        self.ctors.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ProviderStore, DEFAULT_CANDLE_WINDOW};
    use async_trait::async_trait;
    use feeder_core::{CandlePrice, Symbol, TickerPrice};
    use std::collections::HashSet;

    struct StoreBacked {
        store: ProviderStore,
    }

    #[async_trait]
    impl Provider for StoreBacked {
        fn name(&self) -> &str {
            self.store.name()
        }

        async fn get_ticker_prices(
            &self,
            pairs: &[CurrencyPair],
        ) -> ProviderResult<HashMap<Symbol, TickerPrice>> {
            self.store.tickers_for(pairs)
        }

        async fn get_candle_prices(
            &self,
            pairs: &[CurrencyPair],
        ) -> ProviderResult<HashMap<Symbol, Vec<CandlePrice>>> {
            self.store.candles_for(pairs)
        }

        async fn get_available_pairs(&self) -> ProviderResult<HashSet<Symbol>> {
            Ok(HashSet::new())
        }
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let registry = ProviderRegistry::new();
        let result = registry.build("nosuch", &[]);
        assert!(matches!(result, Err(ProviderError::UnknownProvider(_))));
    }

    #[tokio::test]
    async fn test_build_registered_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register(
            "mock",
            Arc::new(|_pairs| {
                Ok(Arc::new(StoreBacked {
                    store: ProviderStore::new("mock", DEFAULT_CANDLE_WINDOW),
                }) as Arc<dyn Provider>)
            }),
        );

        assert!(registry.contains("mock"));
        let pairs = vec![CurrencyPair::new("ATOM", "USDT").unwrap()];
        let provider = registry.build("mock", &pairs).unwrap();
        assert_eq!(provider.name(), "mock");
        // Nothing ingested yet: total failure by the partial-success policy.
        assert!(provider.get_ticker_prices(&pairs).await.is_err());
    }
}
