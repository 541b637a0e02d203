//! The capability contract every market data source implements.

use crate::error::ProviderResult;
use async_trait::async_trait;
use feeder_core::{CandlePrice, CurrencyPair, Symbol, TickerPrice};
use std::collections::{HashMap, HashSet};

/// A market data source.
///
/// Implementations must allow concurrent reads of their internal price
/// maps while a single background task performs writes; reads never
/// block on writes beyond a brief lock hold ([`crate::ProviderStore`]
/// provides exactly that).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used in configuration, logs and metrics.
    fn name(&self) -> &str;

    /// Latest cached tickers for whatever subset of `pairs` this source
    /// can currently serve. Fails with
    /// [`ProviderError::NoTickers`](crate::ProviderError::NoTickers)
    /// only when none of the requested pairs can be served.
    async fn get_ticker_prices(
        &self,
        pairs: &[CurrencyPair],
    ) -> ProviderResult<HashMap<Symbol, TickerPrice>>;

    /// Recent cached candles for whatever subset of `pairs` this source
    /// can currently serve, newest first. Fails with
    /// [`ProviderError::NoCandles`](crate::ProviderError::NoCandles)
    /// only on total failure.
    async fn get_candle_prices(
        &self,
        pairs: &[CurrencyPair],
    ) -> ProviderResult<HashMap<Symbol, Vec<CandlePrice>>>;

    /// Add pairs to the live stream. Poll-based sources keep the
    /// default no-op.
    async fn subscribe_currency_pairs(&self, pairs: &[CurrencyPair]) -> ProviderResult<()> {
        let _ = pairs;
        Ok(())
    }

    /// Pairs the exchange supports, used by configuration validation.
    async fn get_available_pairs(&self) -> ProviderResult<HashSet<Symbol>>;
}
