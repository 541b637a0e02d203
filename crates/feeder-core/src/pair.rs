//! Currency pair identity.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote denomination every consensus price is normalized to.
pub const USD_DENOM: &str = "USD";

/// An ordered (base, quote) asset symbol tuple, e.g. ATOM/USDT.
///
/// Symbols are stored uppercase; the canonical string form used as a
/// map key throughout the feeder is `BASEQUOTE` (no separator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    /// Create a new pair, uppercasing both symbols.
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> CoreResult<Self> {
        let base = base.as_ref().trim().to_uppercase();
        let quote = quote.as_ref().trim().to_uppercase();
        if base.is_empty() || quote.is_empty() || base == quote {
            return Err(CoreError::InvalidPair(format!("{base}/{quote}")));
        }
        Ok(Self { base, quote })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Canonical symbol form: `BASEQUOTE`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Whether this pair is already quoted in USD.
    pub fn is_usd_quoted(&self) -> bool {
        self.quote == USD_DENOM
    }

    /// The one-hop conversion pair for this pair's quote currency,
    /// e.g. ATOM/USDT -> USDT/USD. None when already USD-quoted.
    pub fn conversion_pair(&self) -> Option<CurrencyPair> {
        if self.is_usd_quoted() {
            return None;
        }
        Some(Self {
            base: self.quote.clone(),
            quote: USD_DENOM.to_string(),
        })
    }

    /// Symbol this pair's prices are published under once normalized,
    /// i.e. `BASE + "USD"`.
    pub fn usd_symbol(&self) -> String {
        format!("{}{}", self.base, USD_DENOM)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_uppercases() {
        let pair = CurrencyPair::new("atom", "usdt").unwrap();
        assert_eq!(pair.base(), "ATOM");
        assert_eq!(pair.quote(), "USDT");
        assert_eq!(pair.symbol(), "ATOMUSDT");
    }

    #[test]
    fn test_pair_rejects_empty_and_identical() {
        assert!(CurrencyPair::new("", "USD").is_err());
        assert!(CurrencyPair::new("ATOM", "").is_err());
        assert!(CurrencyPair::new("USD", "usd").is_err());
    }

    #[test]
    fn test_conversion_pair() {
        let pair = CurrencyPair::new("ATOM", "USDT").unwrap();
        let conv = pair.conversion_pair().unwrap();
        assert_eq!(conv.symbol(), "USDTUSD");
        assert_eq!(pair.usd_symbol(), "ATOMUSD");

        let usd = CurrencyPair::new("ATOM", "USD").unwrap();
        assert!(usd.conversion_pair().is_none());
        assert!(usd.is_usd_quoted());
    }
}
