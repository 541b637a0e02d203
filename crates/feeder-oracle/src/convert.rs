//! Single-hop USD cross-rate conversion.
//!
//! A configured pair's quote currency may not be USD (e.g. ATOM/USDT).
//! For each such pair the converter derives a USD rate for the quote
//! currency from the providers that quote it directly against USD,
//! deviation-filters those rate quotes, reduces them (VWAP for tickers,
//! TVWAP for candles), and rewrites every reporting provider's entry to
//! the `BASEUSD` symbol with price × rate. Exactly one hop is resolved:
//! `quote → USD`. Chains such as `X → Y → USD` are not attempted; this
//! is a fixed constraint of the converter, not an extension point.
//!
//! A quote currency with no USD route (or zero usable samples) fails
//! conversion for its pairs only: those entries are dropped from the
//! cycle and unrelated pairs are unaffected.

use crate::deviation::{filter_candle_deviations, filter_ticker_deviations};
use crate::error::{OracleError, OracleResult};
use crate::vwap::{compute_tvwap, compute_vwap};
use feeder_core::{
    AggregatedCandles, AggregatedPrices, CandlePrice, CurrencyPair, ProviderName, Symbol,
    TickerPrice,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::warn;

/// Configured pair assignments: provider name -> pairs it serves.
pub type ProviderPairs = HashMap<ProviderName, Vec<CurrencyPair>>;

/// Convert all non-USD-quoted ticker entries to USD, one hop.
pub fn convert_tickers_to_usd(
    tickers: AggregatedPrices,
    provider_pairs: &ProviderPairs,
    threshold: Decimal,
) -> OracleResult<AggregatedPrices> {
    let symbol_index = symbol_index(provider_pairs);
    let rates = resolve_rates(&symbol_index, |quote| {
        usd_rate_from_tickers(quote, &tickers, provider_pairs, threshold)
    });

    let mut converted = AggregatedPrices::new();
    for (provider, tickers_by_symbol) in tickers {
        let mut out: HashMap<Symbol, TickerPrice> = HashMap::new();
        for (symbol, ticker) in tickers_by_symbol {
            match symbol_index.get(&symbol).filter(|p| !p.is_usd_quoted()) {
                None => {
                    out.insert(symbol, ticker);
                }
                Some(pair) => {
                    if let Some(rate) = rates.get(pair.quote()) {
                        out.insert(
                            pair.usd_symbol(),
                            TickerPrice {
                                price: ticker.price * *rate,
                                volume: ticker.volume,
                            },
                        );
                    }
                }
            }
        }
        if !out.is_empty() {
            converted.insert(provider, out);
        }
    }

    Ok(converted)
}

/// Convert all non-USD-quoted candle entries to USD, one hop.
pub fn convert_candles_to_usd(
    candles: AggregatedCandles,
    provider_pairs: &ProviderPairs,
    staleness: Duration,
    threshold: Decimal,
) -> OracleResult<AggregatedCandles> {
    let symbol_index = symbol_index(provider_pairs);
    let rates = resolve_rates(&symbol_index, |quote| {
        usd_rate_from_candles(quote, &candles, provider_pairs, staleness, threshold)
    });

    let mut converted = AggregatedCandles::new();
    for (provider, series_by_symbol) in candles {
        let mut out: HashMap<Symbol, Vec<CandlePrice>> = HashMap::new();
        for (symbol, series) in series_by_symbol {
            match symbol_index.get(&symbol).filter(|p| !p.is_usd_quoted()) {
                None => {
                    out.insert(symbol, series);
                }
                Some(pair) => {
                    if let Some(rate) = rates.get(pair.quote()) {
                        let rescaled = series
                            .into_iter()
                            .map(|candle| CandlePrice {
                                price: candle.price * *rate,
                                volume: candle.volume,
                                timestamp: candle.timestamp,
                            })
                            .collect();
                        out.insert(pair.usd_symbol(), rescaled);
                    }
                }
            }
        }
        if !out.is_empty() {
            converted.insert(provider, out);
        }
    }

    Ok(converted)
}

/// Canonical symbol -> configured pair, across all assignments.
fn symbol_index(provider_pairs: &ProviderPairs) -> HashMap<Symbol, CurrencyPair> {
    let mut index = HashMap::new();
    for pairs in provider_pairs.values() {
        for pair in pairs {
            index.entry(pair.symbol()).or_insert_with(|| pair.clone());
        }
    }
    index
}

/// Resolve one USD rate per distinct non-USD quote currency. A failed
/// quote currency is logged and skipped; its pairs drop out of the
/// cycle while everything else proceeds.
fn resolve_rates(
    symbol_index: &HashMap<Symbol, CurrencyPair>,
    rate_for: impl Fn(&str) -> OracleResult<Decimal>,
) -> HashMap<String, Decimal> {
    let quotes: HashSet<&str> = symbol_index
        .values()
        .filter(|pair| !pair.is_usd_quoted())
        .map(|pair| pair.quote())
        .collect();

    let mut rates = HashMap::new();
    for quote in quotes {
        match rate_for(quote) {
            Ok(rate) => {
                rates.insert(quote.to_string(), rate);
            }
            Err(e) => {
                warn!(
                    quote = %quote,
                    error = %e,
                    "USD conversion unavailable; dropping pairs quoted in it this cycle"
                );
            }
        }
    }
    rates
}

fn usd_rate_from_tickers(
    quote: &str,
    tickers: &AggregatedPrices,
    provider_pairs: &ProviderPairs,
    threshold: Decimal,
) -> OracleResult<Decimal> {
    let conversion_symbol = format!("{quote}USD");
    let mut rate_quotes = AggregatedPrices::new();

    for (provider, pairs) in provider_pairs {
        if !quotes_against_usd(pairs, quote) {
            continue;
        }
        if let Some(ticker) = tickers
            .get(provider)
            .and_then(|by_symbol| by_symbol.get(&conversion_symbol))
        {
            rate_quotes
                .entry(provider.clone())
                .or_default()
                .insert(conversion_symbol.clone(), ticker.clone());
        }
    }

    if rate_quotes.is_empty() {
        return Err(OracleError::NoConversionRate(quote.to_string()));
    }

    let filtered = filter_ticker_deviations(&rate_quotes, threshold)?;
    let vwap = compute_vwap(&filtered)?;
    vwap.get(&conversion_symbol)
        .copied()
        .ok_or_else(|| OracleError::NoConversionRate(quote.to_string()))
}

fn usd_rate_from_candles(
    quote: &str,
    candles: &AggregatedCandles,
    provider_pairs: &ProviderPairs,
    staleness: Duration,
    threshold: Decimal,
) -> OracleResult<Decimal> {
    let conversion_symbol = format!("{quote}USD");
    let mut rate_candles = AggregatedCandles::new();

    for (provider, pairs) in provider_pairs {
        if !quotes_against_usd(pairs, quote) {
            continue;
        }
        if let Some(series) = candles
            .get(provider)
            .and_then(|by_symbol| by_symbol.get(&conversion_symbol))
        {
            if !series.is_empty() {
                rate_candles
                    .entry(provider.clone())
                    .or_default()
                    .insert(conversion_symbol.clone(), series.clone());
            }
        }
    }

    if rate_candles.is_empty() {
        return Err(OracleError::NoConversionRate(quote.to_string()));
    }

    let filtered = filter_candle_deviations(&rate_candles, staleness, threshold)?;
    let tvwap = compute_tvwap(&filtered, staleness)?;
    tvwap
        .get(&conversion_symbol)
        .copied()
        .ok_or_else(|| OracleError::NoConversionRate(quote.to_string()))
}

fn quotes_against_usd(pairs: &[CurrencyPair], base: &str) -> bool {
    pairs
        .iter()
        .any(|pair| pair.base() == base && pair.is_usd_quoted())
}
