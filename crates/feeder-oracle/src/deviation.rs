//! Cross-provider statistical outlier rejection.
//!
//! For every symbol the filter computes the cross-provider mean and
//! standard deviation of current prices and drops quotes farther than
//! `threshold · σ` from the mean. With fewer than three reporting
//! providers no meaningful spread can be judged, so nothing is
//! computed and every quote passes.

use crate::error::OracleResult;
use crate::vwap::tvwap_by_provider;
use feeder_core::{AggregatedCandles, AggregatedPrices, Symbol};
use feeder_telemetry::metrics;
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Minimum cross-provider samples before a spread is judged.
const MIN_DEVIATION_SAMPLES: usize = 3;

/// Default acceptance band: one standard deviation around the mean.
pub fn default_deviation_threshold() -> Decimal {
    Decimal::ONE
}

/// Remove ticker quotes that deviate from the cross-provider mean by
/// more than `threshold` standard deviations.
pub fn filter_ticker_deviations(
    prices: &AggregatedPrices,
    threshold: Decimal,
) -> OracleResult<AggregatedPrices> {
    let mut samples: HashMap<Symbol, Vec<Decimal>> = HashMap::new();
    for tickers in prices.values() {
        for (symbol, ticker) in tickers {
            samples
                .entry(symbol.clone())
                .or_default()
                .push(ticker.price.inner());
        }
    }
    let stats = deviation_stats(&samples);

    let mut filtered = AggregatedPrices::new();
    for (provider, tickers) in prices {
        let mut kept = HashMap::new();
        for (symbol, ticker) in tickers {
            match stats.get(symbol) {
                // No spread judged for this symbol: keep the quote.
                None => {
                    kept.insert(symbol.clone(), ticker.clone());
                }
                Some((mean, stddev)) => {
                    if within_band(ticker.price.inner(), *mean, *stddev, threshold) {
                        kept.insert(symbol.clone(), ticker.clone());
                    } else {
                        warn!(
                            provider = %provider,
                            symbol = %symbol,
                            price = %ticker.price,
                            mean = %mean,
                            "Rejecting deviant ticker quote"
                        );
                        metrics::record_deviation_reject(provider, symbol, metrics::KIND_TICKER);
                    }
                }
            }
        }
        if !kept.is_empty() {
            filtered.insert(provider.clone(), kept);
        }
    }

    Ok(filtered)
}

/// Remove whole per-provider candle histories whose own TVWAP deviates
/// from the cross-provider mean by more than `threshold` standard
/// deviations. The rule is applied to each provider's TVWAP per symbol,
/// not to individual candles.
pub fn filter_candle_deviations(
    candles: &AggregatedCandles,
    staleness: Duration,
    threshold: Decimal,
) -> OracleResult<AggregatedCandles> {
    let provider_tvwaps = tvwap_by_provider(candles, staleness);

    let mut samples: HashMap<Symbol, Vec<Decimal>> = HashMap::new();
    for by_symbol in provider_tvwaps.values() {
        for (symbol, value) in by_symbol {
            samples.entry(symbol.clone()).or_default().push(*value);
        }
    }
    let stats = deviation_stats(&samples);

    let mut filtered = AggregatedCandles::new();
    for (provider, series_by_symbol) in candles {
        let mut kept = HashMap::new();
        for (symbol, series) in series_by_symbol {
            match stats.get(symbol) {
                None => {
                    kept.insert(symbol.clone(), series.clone());
                }
                Some((mean, stddev)) => {
                    let value = provider_tvwaps
                        .get(provider)
                        .and_then(|by_symbol| by_symbol.get(symbol));
                    match value {
                        Some(value) if within_band(*value, *mean, *stddev, threshold) => {
                            kept.insert(symbol.clone(), series.clone());
                        }
                        Some(value) => {
                            warn!(
                                provider = %provider,
                                symbol = %symbol,
                                tvwap = %value,
                                mean = %mean,
                                "Rejecting deviant candle history"
                            );
                            metrics::record_deviation_reject(
                                provider,
                                symbol,
                                metrics::KIND_CANDLE,
                            );
                        }
                        None => {
                            debug!(
                                provider = %provider,
                                symbol = %symbol,
                                "No weighable candles; dropping history this cycle"
                            );
                        }
                    }
                }
            }
        }
        if !kept.is_empty() {
            filtered.insert(provider.clone(), kept);
        }
    }

    Ok(filtered)
}

fn within_band(price: Decimal, mean: Decimal, stddev: Decimal, threshold: Decimal) -> bool {
    (price - mean).abs() <= threshold * stddev
}

/// Mean and population standard deviation per symbol, for symbols with
/// at least [`MIN_DEVIATION_SAMPLES`] samples.
fn deviation_stats(samples: &HashMap<Symbol, Vec<Decimal>>) -> HashMap<Symbol, (Decimal, Decimal)> {
    let mut out = HashMap::new();
    for (symbol, values) in samples {
        if values.len() < MIN_DEVIATION_SAMPLES {
            continue;
        }
        let n = Decimal::from(values.len());
        let mean = values.iter().sum::<Decimal>() / n;
        let variance = values
            .iter()
            .map(|v| {
                let d = *v - mean;
                d * d
            })
            .sum::<Decimal>()
            / n;
        let stddev = variance.sqrt().unwrap_or(Decimal::ZERO);
        out.insert(symbol.clone(), (mean, stddev));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeder_core::{CandlePrice, TickerPrice};
    use rust_decimal_macros::dec;

    fn prices_of(entries: &[(&str, &str, Decimal)]) -> AggregatedPrices {
        let mut out = AggregatedPrices::new();
        for (provider, symbol, price) in entries {
            out.entry(provider.to_string()).or_default().insert(
                symbol.to_string(),
                TickerPrice::new(*price, dec!(100)).unwrap(),
            );
        }
        out
    }

    #[test]
    fn test_outlier_alone_is_removed() {
        let prices = prices_of(&[
            ("a", "ATOMUSDT", dec!(29.93)),
            ("b", "ATOMUSDT", dec!(29.95)),
            ("c", "ATOMUSDT", dec!(29.91)),
            ("d", "ATOMUSDT", dec!(27.1)),
        ]);

        let filtered = filter_ticker_deviations(&prices, default_deviation_threshold()).unwrap();

        assert_eq!(filtered.len(), 3);
        assert!(filtered.contains_key("a"));
        assert!(filtered.contains_key("b"));
        assert!(filtered.contains_key("c"));
        assert!(!filtered.contains_key("d"));
    }

    #[test]
    fn test_below_three_samples_nothing_filtered() {
        // Wild spread, but only two providers: no deviation is judged.
        let prices = prices_of(&[
            ("a", "ATOMUSDT", dec!(29.93)),
            ("b", "ATOMUSDT", dec!(3.5)),
        ]);

        let filtered = filter_ticker_deviations(&prices, default_deviation_threshold()).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_identical_quotes_all_kept() {
        let prices = prices_of(&[
            ("a", "ATOMUSDT", dec!(29.93)),
            ("b", "ATOMUSDT", dec!(29.93)),
            ("c", "ATOMUSDT", dec!(29.93)),
        ]);

        let filtered = filter_ticker_deviations(&prices, default_deviation_threshold()).unwrap();
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_candle_filter_judges_provider_tvwap() {
        let now = chrono::Utc::now().timestamp_millis();
        let mut candles = AggregatedCandles::new();
        for (provider, price) in [("a", dec!(29.93)), ("b", dec!(29.95)), ("c", dec!(29.91))] {
            candles.entry(provider.to_string()).or_default().insert(
                "ATOMUSD".to_string(),
                vec![CandlePrice::new(price, dec!(10), now).unwrap()],
            );
        }
        candles.entry("d".to_string()).or_default().insert(
            "ATOMUSD".to_string(),
            vec![
                CandlePrice::new(dec!(27.2), dec!(10), now).unwrap(),
                CandlePrice::new(dec!(27.0), dec!(10), now - 1_000).unwrap(),
            ],
        );

        let filtered = filter_candle_deviations(
            &candles,
            Duration::from_secs(60),
            default_deviation_threshold(),
        )
        .unwrap();

        assert_eq!(filtered.len(), 3);
        assert!(!filtered.contains_key("d"));
    }
}
