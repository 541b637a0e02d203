//! Volume-weighted average price reducers.

use crate::error::{OracleError, OracleResult};
use chrono::Utc;
use feeder_core::{AggregatedCandles, AggregatedPrices, ProviderName, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

/// Volume-weighted average price per symbol across all providers.
///
/// For each symbol: Σ(price · volume) / Σ(volume). A pure reduction
/// over an unordered collection; permuting the provider map yields an
/// identical result. A symbol whose summed volume is exactly zero fails
/// with [`OracleError::ZeroVolume`].
pub fn compute_vwap(prices: &AggregatedPrices) -> OracleResult<HashMap<Symbol, Decimal>> {
    let mut weighted: HashMap<Symbol, Decimal> = HashMap::new();
    let mut volumes: HashMap<Symbol, Decimal> = HashMap::new();

    for tickers in prices.values() {
        for (symbol, ticker) in tickers {
            accumulate(
                &mut weighted,
                &mut volumes,
                symbol,
                ticker.price.inner(),
                ticker.volume.inner(),
            )?;
        }
    }

    divide_out(weighted, &volumes)
}

/// Time-volume-weighted average price per symbol across all providers'
/// recent candle history.
///
/// The same reduction as [`compute_vwap`], applied to every candle
/// inside the staleness window, each candle's own volume as weight.
pub fn compute_tvwap(
    candles: &AggregatedCandles,
    staleness: Duration,
) -> OracleResult<HashMap<Symbol, Decimal>> {
    let cutoff = Utc::now().timestamp_millis() - staleness.as_millis() as i64;
    let mut weighted: HashMap<Symbol, Decimal> = HashMap::new();
    let mut volumes: HashMap<Symbol, Decimal> = HashMap::new();

    for series_by_symbol in candles.values() {
        for (symbol, series) in series_by_symbol {
            for candle in series.iter().filter(|c| c.timestamp >= cutoff) {
                accumulate(
                    &mut weighted,
                    &mut volumes,
                    symbol,
                    candle.price.inner(),
                    candle.volume.inner(),
                )?;
            }
        }
    }

    divide_out(weighted, &volumes)
}

/// Each provider's own TVWAP per symbol, used to judge a provider's
/// candle history against the cross-provider spread. Symbols a provider
/// reports only with zero weight yield no value.
pub(crate) fn tvwap_by_provider(
    candles: &AggregatedCandles,
    staleness: Duration,
) -> HashMap<ProviderName, HashMap<Symbol, Decimal>> {
    let cutoff = Utc::now().timestamp_millis() - staleness.as_millis() as i64;
    let mut out: HashMap<ProviderName, HashMap<Symbol, Decimal>> = HashMap::new();

    for (provider, series_by_symbol) in candles {
        for (symbol, series) in series_by_symbol {
            let mut weighted = Decimal::ZERO;
            let mut volume = Decimal::ZERO;
            for candle in series.iter().filter(|c| c.timestamp >= cutoff) {
                let Some(term) = candle.price.inner().checked_mul(candle.volume.inner()) else {
                    continue;
                };
                let Some(w) = weighted.checked_add(term) else {
                    continue;
                };
                weighted = w;
                volume += candle.volume.inner();
            }
            if !volume.is_zero() {
                out.entry(provider.clone())
                    .or_default()
                    .insert(symbol.clone(), weighted / volume);
            }
        }
    }

    out
}

fn accumulate(
    weighted: &mut HashMap<Symbol, Decimal>,
    volumes: &mut HashMap<Symbol, Decimal>,
    symbol: &Symbol,
    price: Decimal,
    volume: Decimal,
) -> OracleResult<()> {
    let term = price
        .checked_mul(volume)
        .ok_or_else(|| OracleError::Overflow(symbol.clone()))?;

    let w = weighted.entry(symbol.clone()).or_insert(Decimal::ZERO);
    *w = w
        .checked_add(term)
        .ok_or_else(|| OracleError::Overflow(symbol.clone()))?;

    let v = volumes.entry(symbol.clone()).or_insert(Decimal::ZERO);
    *v = v
        .checked_add(volume)
        .ok_or_else(|| OracleError::Overflow(symbol.clone()))?;

    Ok(())
}

fn divide_out(
    weighted: HashMap<Symbol, Decimal>,
    volumes: &HashMap<Symbol, Decimal>,
) -> OracleResult<HashMap<Symbol, Decimal>> {
    weighted
        .into_iter()
        .map(|(symbol, sum)| {
            let volume = volumes[&symbol];
            if volume.is_zero() {
                return Err(OracleError::ZeroVolume(symbol));
            }
            Ok((symbol, sum / volume))
        })
        .collect()
}
