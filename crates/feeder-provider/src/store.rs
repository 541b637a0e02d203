//! Per-provider cached market data.
//!
//! One store per adapter. The owning adapter's ingestion path is the
//! only writer; orchestrator fetches take brief read locks. Candle
//! sequences stay newest-first and bounded to the rolling window,
//! pruned on every write.

use crate::error::{ProviderError, ProviderResult};
use chrono::Utc;
use feeder_core::{CandlePrice, CurrencyPair, Symbol, TickerPrice};
use feeder_telemetry::metrics;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

/// Rolling retention for candle history.
pub const DEFAULT_CANDLE_WINDOW: Duration = Duration::from_secs(600);

/// Reader/writer-locked price maps behind one provider.
pub struct ProviderStore {
    name: String,
    tickers: RwLock<HashMap<Symbol, TickerPrice>>,
    candles: RwLock<HashMap<Symbol, Vec<CandlePrice>>>,
    candle_window: Duration,
}

impl ProviderStore {
    pub fn new(name: impl Into<String>, candle_window: Duration) -> Self {
        Self {
            name: name.into(),
            tickers: RwLock::new(HashMap::new()),
            candles: RwLock::new(HashMap::new()),
            candle_window,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the latest ticker for a symbol.
    pub fn set_ticker(&self, symbol: Symbol, ticker: TickerPrice) {
        self.tickers.write().insert(symbol, ticker);
        metrics::record_message(&self.name, metrics::KIND_TICKER);
    }

    /// Insert a candle, keeping the sequence newest-first and dropping
    /// entries older than the rolling window.
    pub fn add_candle(&self, symbol: Symbol, candle: CandlePrice) {
        let cutoff = Utc::now().timestamp_millis() - self.candle_window.as_millis() as i64;
        let mut candles = self.candles.write();
        let series = candles.entry(symbol).or_default();

        let at = series
            .iter()
            .position(|c| c.timestamp <= candle.timestamp)
            .unwrap_or(series.len());
        series.insert(at, candle);
        series.retain(|c| c.timestamp >= cutoff);

        metrics::record_message(&self.name, metrics::KIND_CANDLE);
    }

    /// Tickers for the requested pairs; partial success. Errs with
    /// `NoTickers` only when no requested pair can be served.
    pub fn tickers_for(
        &self,
        pairs: &[CurrencyPair],
    ) -> ProviderResult<HashMap<Symbol, TickerPrice>> {
        let tickers = self.tickers.read();
        let found: HashMap<Symbol, TickerPrice> = pairs
            .iter()
            .filter_map(|pair| {
                let symbol = pair.symbol();
                tickers.get(&symbol).map(|t| (symbol, t.clone()))
            })
            .collect();

        if found.is_empty() {
            return Err(ProviderError::NoTickers {
                provider: self.name.clone(),
            });
        }
        Ok(found)
    }

    /// Candles for the requested pairs; partial success. Errs with
    /// `NoCandles` only when no requested pair can be served.
    pub fn candles_for(
        &self,
        pairs: &[CurrencyPair],
    ) -> ProviderResult<HashMap<Symbol, Vec<CandlePrice>>> {
        let candles = self.candles.read();
        let found: HashMap<Symbol, Vec<CandlePrice>> = pairs
            .iter()
            .filter_map(|pair| {
                let symbol = pair.symbol();
                candles
                    .get(&symbol)
                    .filter(|series| !series.is_empty())
                    .map(|series| (symbol, series.clone()))
            })
            .collect();

        if found.is_empty() {
            return Err(ProviderError::NoCandles {
                provider: self.name.clone(),
            });
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pair(base: &str, quote: &str) -> CurrencyPair {
        CurrencyPair::new(base, quote).unwrap()
    }

    fn candle(price: &str, volume: &str, timestamp: i64) -> CandlePrice {
        CandlePrice::new(price.parse().unwrap(), volume.parse().unwrap(), timestamp).unwrap()
    }

    #[test]
    fn test_partial_success_policy() {
        let store = ProviderStore::new("mock", DEFAULT_CANDLE_WINDOW);
        let atom = pair("ATOM", "USDT");
        let osmo = pair("OSMO", "USDT");

        assert!(matches!(
            store.tickers_for(&[atom.clone()]),
            Err(ProviderError::NoTickers { .. })
        ));

        store.set_ticker(
            atom.symbol(),
            TickerPrice::new(dec!(29.93), dec!(100)).unwrap(),
        );

        // One of two requested pairs served: still a success.
        let served = store.tickers_for(&[atom.clone(), osmo.clone()]).unwrap();
        assert_eq!(served.len(), 1);
        assert!(served.contains_key("ATOMUSDT"));

        // None served: total failure.
        assert!(store.tickers_for(&[osmo]).is_err());
    }

    #[test]
    fn test_candles_newest_first_and_pruned() {
        let store = ProviderStore::new("mock", Duration::from_secs(60));
        let atom = pair("ATOM", "USDT");
        let now = Utc::now().timestamp_millis();

        store.add_candle(atom.symbol(), candle("29.90", "10", now - 30_000));
        store.add_candle(atom.symbol(), candle("29.95", "10", now - 5_000));
        store.add_candle(atom.symbol(), candle("29.92", "10", now - 15_000));
        // Outside the 60s window: dropped on the next write.
        store.add_candle(atom.symbol(), candle("28.00", "10", now - 120_000));

        let series = store
            .candles_for(&[atom])
            .unwrap()
            .remove("ATOMUSDT")
            .unwrap();
        assert_eq!(series.len(), 3);
        let timestamps: Vec<i64> = series.iter().map(|c| c.timestamp).collect();
        assert_eq!(
            timestamps,
            vec![now - 5_000, now - 15_000, now - 30_000],
            "candles must stay newest-first"
        );
    }

    #[test]
    fn test_candles_empty_series_is_total_failure() {
        let store = ProviderStore::new("mock", DEFAULT_CANDLE_WINDOW);
        assert!(matches!(
            store.candles_for(&[pair("ATOM", "USDT")]),
            Err(ProviderError::NoCandles { .. })
        ));
    }
}
