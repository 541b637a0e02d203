//! Precision-safe decimal types for price aggregation.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, avoiding
//! floating-point rounding errors in consensus price computation.
//! Both types reject negative values at construction, so downstream
//! aggregation never has to re-check sign.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

/// Price with exact decimal precision.
///
/// Wraps `Decimal` to provide type safety and prevent mixing
/// prices with volumes in calculations. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price, rejecting negative values.
    pub fn new(value: Decimal) -> CoreResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoreError::InvalidPrice(value.to_string()));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Price {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.parse()?)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Traded volume with exact decimal precision. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volume(Decimal);

impl Volume {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new volume, rejecting negative values.
    pub fn new(value: Decimal) -> CoreResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoreError::InvalidVolume(value.to_string()));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Volume {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.parse()?)
    }
}

impl Add for Volume {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_rejects_negative() {
        assert!(Price::new(dec!(-0.01)).is_err());
        assert!(Price::new(dec!(0)).is_ok());
        assert!(Price::new(dec!(29.93)).is_ok());
    }

    #[test]
    fn test_volume_rejects_negative() {
        assert!(Volume::new(dec!(-1)).is_err());
        assert!(Volume::new(dec!(0)).is_ok());
    }

    #[test]
    fn test_price_parse() {
        let p: Price = "40.13".parse().unwrap();
        assert_eq!(p.inner(), dec!(40.13));
        assert!("-40.13".parse::<Price>().is_err());
    }

    #[test]
    fn test_price_scale_by_rate() {
        let p = Price::new(dec!(38)).unwrap();
        let converted = p * dec!(0.998);
        assert_eq!(converted.inner(), dec!(37.924));
    }
}
