//! Market data samples and aggregated map shapes.

use crate::decimal::{Price, Volume};
use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider identifier, e.g. "binance".
pub type ProviderName = String;

/// Canonical pair symbol, e.g. "ATOMUSDT".
pub type Symbol = String;

/// Latest instantaneous quote from one provider for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerPrice {
    pub price: Price,
    pub volume: Volume,
}

impl TickerPrice {
    pub fn new(price: Decimal, volume: Decimal) -> CoreResult<Self> {
        Ok(Self {
            price: Price::new(price)?,
            volume: Volume::new(volume)?,
        })
    }

    /// Parse from the string fields most exchange payloads carry.
    pub fn from_strs(price: &str, volume: &str) -> CoreResult<Self> {
        Ok(Self {
            price: price.parse()?,
            volume: volume.parse()?,
        })
    }
}

/// A historical price/volume sample with a unix-millisecond timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandlePrice {
    pub price: Price,
    pub volume: Volume,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl CandlePrice {
    pub fn new(price: Decimal, volume: Decimal, timestamp: i64) -> CoreResult<Self> {
        if timestamp < 0 {
            return Err(CoreError::InvalidTimestamp(timestamp));
        }
        Ok(Self {
            price: Price::new(price)?,
            volume: Volume::new(volume)?,
            timestamp,
        })
    }
}

/// providerName -> (pairSymbol -> latest ticker).
pub type AggregatedPrices = HashMap<ProviderName, HashMap<Symbol, TickerPrice>>;

/// providerName -> (pairSymbol -> candles, newest first).
pub type AggregatedCandles = HashMap<ProviderName, HashMap<Symbol, Vec<CandlePrice>>>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ticker_rejects_negative_parts() {
        assert!(TickerPrice::new(dec!(-1), dec!(1)).is_err());
        assert!(TickerPrice::new(dec!(1), dec!(-1)).is_err());
        assert!(TickerPrice::new(dec!(1), dec!(0)).is_ok());
    }

    #[test]
    fn test_ticker_from_strs() {
        let t = TickerPrice::from_strs("29.93", "1024.5").unwrap();
        assert_eq!(t.price.inner(), dec!(29.93));
        assert_eq!(t.volume.inner(), dec!(1024.5));
        assert!(TickerPrice::from_strs("abc", "1").is_err());
    }

    #[test]
    fn test_candle_rejects_negative_timestamp() {
        assert!(CandlePrice::new(dec!(1), dec!(1), -5).is_err());
        assert!(CandlePrice::new(dec!(1), dec!(1), 0).is_ok());
    }
}
