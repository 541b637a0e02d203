//! Orchestration of the fetch → filter → convert → aggregate pipeline.
//!
//! The oracle owns the live provider set and the published snapshots.
//! One `set_prices` cycle fetches from every configured provider
//! concurrently with a bounded fan-out and a per-call timeout, so one
//! slow or hung exchange cannot stall the cycle for the rest; a
//! provider that fails is excluded from the cycle without aborting it.

use crate::convert::{convert_candles_to_usd, convert_tickers_to_usd, ProviderPairs};
use crate::deviation::{
    default_deviation_threshold, filter_candle_deviations, filter_ticker_deviations,
};
use crate::error::{OracleError, OracleResult};
use crate::vwap::{compute_tvwap, compute_vwap};
use chrono::{DateTime, Utc};
use feeder_core::{AggregatedCandles, AggregatedPrices, CurrencyPair, Symbol};
use feeder_provider::Provider;
use feeder_telemetry::metrics;
use futures_util::stream::{self, StreamExt};
use parking_lot::RwLock;
use rand::RngCore;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Staleness window for candle-based averaging.
pub const DEFAULT_TVWAP_WINDOW: Duration = Duration::from_secs(600);

/// Per-provider fetch timeout inside one cycle.
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded fan-out for concurrent provider fetches.
const FETCH_CONCURRENCY: usize = 8;

/// Decimal places used when serializing exchange rates for a vote.
const EXCHANGE_RATE_PRECISION: usize = 18;

/// Oracle configuration, already validated by the caller.
#[derive(Clone)]
pub struct OracleConfig {
    /// Provider name -> pairs it is queried for.
    pub provider_pairs: ProviderPairs,
    /// Base asset -> minimum providers that must survive filtering for
    /// the asset to be published. Defaults to 1 when absent.
    pub min_providers: HashMap<String, usize>,
    pub deviation_threshold: Decimal,
    pub tvwap_window: Duration,
    pub provider_timeout: Duration,
}

impl OracleConfig {
    pub fn new(provider_pairs: ProviderPairs) -> Self {
        Self {
            provider_pairs,
            min_providers: HashMap::new(),
            deviation_threshold: default_deviation_threshold(),
            tvwap_window: DEFAULT_TVWAP_WINDOW,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// The aggregation orchestrator.
pub struct Oracle {
    providers: HashMap<String, Arc<dyn Provider>>,
    config: OracleConfig,
    prices: RwLock<HashMap<String, Decimal>>,
    vwap_prices: RwLock<HashMap<String, Decimal>>,
    tvwap_prices: RwLock<HashMap<String, Decimal>>,
    last_price_sync: RwLock<Option<DateTime<Utc>>>,
}

impl Oracle {
    pub fn new(providers: Vec<Arc<dyn Provider>>, config: OracleConfig) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        Self {
            providers,
            config,
            prices: RwLock::new(HashMap::new()),
            vwap_prices: RwLock::new(HashMap::new()),
            tvwap_prices: RwLock::new(HashMap::new()),
            last_price_sync: RwLock::new(None),
        }
    }

    /// Run one aggregation cycle and publish the resulting snapshot.
    pub async fn set_prices(&self) -> OracleResult<()> {
        let (tickers, candles) = self.fetch_all().await;

        let tickers = filter_ticker_deviations(&tickers, self.config.deviation_threshold)?;
        let candles = filter_candle_deviations(
            &candles,
            self.config.tvwap_window,
            self.config.deviation_threshold,
        )?;

        let tickers = convert_tickers_to_usd(
            tickers,
            &self.config.provider_pairs,
            self.config.deviation_threshold,
        )?;
        let candles = convert_candles_to_usd(
            candles,
            &self.config.provider_pairs,
            self.config.tvwap_window,
            self.config.deviation_threshold,
        )?;

        let vwap_by_symbol = reduce_tickers_tolerant(tickers.clone());
        let tvwap_by_symbol = reduce_candles_tolerant(candles.clone(), self.config.tvwap_window);

        let mut prices = HashMap::new();
        let mut vwap_assets = HashMap::new();
        let mut tvwap_assets = HashMap::new();

        for pair in self.configured_pairs() {
            let base = pair.base().to_string();
            if prices.contains_key(&base) {
                continue;
            }
            let usd_symbol = pair.usd_symbol();

            let surviving = surviving_providers(&tickers, &candles, &usd_symbol);
            let required = self.config.min_providers.get(&base).copied().unwrap_or(1);
            if surviving < required {
                warn!(
                    asset = %base,
                    surviving,
                    required,
                    "Insufficient surviving providers; omitting asset this cycle"
                );
                continue;
            }

            if let Some(value) = vwap_by_symbol.get(&usd_symbol) {
                vwap_assets.insert(base.clone(), *value);
            }
            if let Some(value) = tvwap_by_symbol.get(&usd_symbol) {
                tvwap_assets.insert(base.clone(), *value);
            }

            // Candle history is the harder signal to manipulate; fall
            // back to the instantaneous average when it is missing.
            match tvwap_assets.get(&base).or_else(|| vwap_assets.get(&base)) {
                Some(price) => {
                    prices.insert(base, *price);
                }
                None => {
                    debug!(asset = %base, "No usable price this cycle");
                }
            }
        }

        *self.prices.write() = prices;
        *self.vwap_prices.write() = vwap_assets;
        *self.tvwap_prices.write() = tvwap_assets;
        *self.last_price_sync.write() = Some(Utc::now());
        metrics::LAST_PRICE_SYNC.set(Utc::now().timestamp());

        Ok(())
    }

    /// Latest consensus price per asset.
    pub fn get_prices(&self) -> HashMap<String, Decimal> {
        self.prices.read().clone()
    }

    /// Latest VWAP per asset.
    pub fn get_vwap_prices(&self) -> HashMap<String, Decimal> {
        self.vwap_prices.read().clone()
    }

    /// Latest TVWAP per asset.
    pub fn get_tvwap_prices(&self) -> HashMap<String, Decimal> {
        self.tvwap_prices.read().clone()
    }

    /// Timestamp of the last successful cycle.
    pub fn last_price_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_price_sync.read()
    }

    /// Fetch tickers and candles from every configured provider
    /// concurrently, tolerating individual failures.
    async fn fetch_all(&self) -> (AggregatedPrices, AggregatedCandles) {
        let fetches = self.config.provider_pairs.iter().filter_map(|(name, pairs)| {
            let Some(provider) = self.providers.get(name) else {
                warn!(provider = %name, "Configured provider has no live instance");
                return None;
            };
            let provider = Arc::clone(provider);
            let pairs = pairs.clone();
            let timeout = self.config.provider_timeout;
            let name = name.clone();
            Some(async move {
                let tickers =
                    tokio::time::timeout(timeout, provider.get_ticker_prices(&pairs)).await;
                let candles =
                    tokio::time::timeout(timeout, provider.get_candle_prices(&pairs)).await;
                (name, tickers, candles)
            })
        });

        let results: Vec<_> = stream::iter(fetches)
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut tickers = AggregatedPrices::new();
        let mut candles = AggregatedCandles::new();
        for (name, ticker_result, candle_result) in results {
            match ticker_result {
                Ok(Ok(map)) => {
                    tickers.insert(name.clone(), map);
                }
                Ok(Err(e)) => {
                    warn!(provider = %name, error = %e, "Ticker fetch failed; excluding this cycle");
                }
                Err(_) => {
                    warn!(provider = %name, "Ticker fetch timed out; excluding this cycle");
                }
            }
            match candle_result {
                Ok(Ok(map)) => {
                    candles.insert(name.clone(), map);
                }
                Ok(Err(e)) => {
                    warn!(provider = %name, error = %e, "Candle fetch failed; excluding this cycle");
                }
                Err(_) => {
                    warn!(provider = %name, "Candle fetch timed out; excluding this cycle");
                }
            }
        }

        (tickers, candles)
    }

    fn configured_pairs(&self) -> Vec<CurrencyPair> {
        let mut seen = HashSet::new();
        let mut pairs = Vec::new();
        for assigned in self.config.provider_pairs.values() {
            for pair in assigned {
                if seen.insert(pair.symbol()) {
                    pairs.push(pair.clone());
                }
            }
        }
        pairs
    }
}

/// Providers still reporting `symbol` on either data path after
/// filtering and conversion.
fn surviving_providers(
    tickers: &AggregatedPrices,
    candles: &AggregatedCandles,
    symbol: &Symbol,
) -> usize {
    let mut names: HashSet<&str> = HashSet::new();
    for (provider, by_symbol) in tickers {
        if by_symbol.contains_key(symbol) {
            names.insert(provider);
        }
    }
    for (provider, by_symbol) in candles {
        if by_symbol.contains_key(symbol) {
            names.insert(provider);
        }
    }
    names.len()
}

/// Reduce tickers, omitting (not crashing on) any single asset whose
/// aggregation fails.
fn reduce_tickers_tolerant(mut tickers: AggregatedPrices) -> HashMap<Symbol, Decimal> {
    loop {
        match compute_vwap(&tickers) {
            Ok(map) => return map,
            Err(OracleError::ZeroVolume(symbol)) | Err(OracleError::Overflow(symbol)) => {
                warn!(symbol = %symbol, "Aggregation failed; omitting asset this cycle");
                for by_symbol in tickers.values_mut() {
                    by_symbol.remove(&symbol);
                }
            }
            Err(e) => {
                warn!(error = %e, "Ticker aggregation aborted");
                return HashMap::new();
            }
        }
    }
}

/// Reduce candles with the same per-asset isolation policy.
fn reduce_candles_tolerant(
    mut candles: AggregatedCandles,
    staleness: Duration,
) -> HashMap<Symbol, Decimal> {
    loop {
        match compute_tvwap(&candles, staleness) {
            Ok(map) => return map,
            Err(OracleError::ZeroVolume(symbol)) | Err(OracleError::Overflow(symbol)) => {
                warn!(symbol = %symbol, "Aggregation failed; omitting asset this cycle");
                for by_symbol in candles.values_mut() {
                    by_symbol.remove(&symbol);
                }
            }
            Err(e) => {
                warn!(error = %e, "Candle aggregation aborted");
                return HashMap::new();
            }
        }
    }
}

/// Random hex salt for commit-reveal voting: `length` random bytes,
/// hex-encoded.
pub fn generate_salt(length: usize) -> OracleResult<String> {
    if length == 0 {
        return Err(OracleError::InvalidSaltLength);
    }
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    Ok(hex::encode(bytes))
}

/// Deterministic serialization of an asset -> price map for the vote
/// payload: assets sorted lexicographically, fixed 18-decimal prices,
/// comma-joined.
pub fn generate_exchange_rates_string(prices: &HashMap<String, Decimal>) -> String {
    let mut entries: Vec<(&String, &Decimal)> = prices.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .iter()
        .map(|(asset, price)| format!("{asset}:{price:.prec$}", prec = EXCHANGE_RATE_PRECISION))
        .collect::<Vec<_>>()
        .join(",")
}
