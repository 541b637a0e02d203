//! On-chain oracle parameter cache.

use crate::error::ChainResult;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Blocks after which cached params must be refreshed.
pub const PARAMS_CACHE_INTERVAL: u64 = 200;

/// Oracle module parameters fetched from the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleParams {
    /// Blocks per voting window.
    pub vote_period: u64,
    /// Fraction of voting power required for a rate to pass.
    pub vote_threshold: Decimal,
    /// Asset symbols the oracle accepts votes for.
    pub accept_list: Vec<String>,
    /// Blocks per slashing window.
    pub slash_window: u64,
    /// Minimum fraction of valid votes per slash window.
    pub min_valid_per_window: Decimal,
}

/// Where oracle params come from; implemented by the chain query
/// client that owns the RPC connection.
#[async_trait]
pub trait ParamsSource: Send + Sync {
    async fn oracle_params(&self) -> ChainResult<OracleParams>;
}

/// Cached oracle params plus the block height they were fetched at.
#[derive(Debug, Default)]
pub struct ParamCache {
    params: Option<OracleParams>,
    last_updated_block: u64,
}

impl ParamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store params fetched at `height`.
    pub fn update(&mut self, height: u64, params: OracleParams) {
        self.params = Some(params);
        self.last_updated_block = height;
    }

    /// Whether cached params must be refreshed at `height`.
    ///
    /// True before the first update, true once the cache interval has
    /// elapsed, and true when the queried height is below the update
    /// height: a height regression is a consistency anomaly, so the
    /// cache forces a refresh instead of trusting it.
    pub fn is_outdated(&self, height: u64) -> bool {
        if self.params.is_none() {
            return true;
        }
        if height < self.last_updated_block {
            return true;
        }
        height - self.last_updated_block > PARAMS_CACHE_INTERVAL
    }

    /// Cached params, if any.
    pub fn params(&self) -> Option<&OracleParams> {
        self.params.as_ref()
    }

    /// Block height of the last update.
    pub fn last_updated_block(&self) -> u64 {
        self.last_updated_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> OracleParams {
        OracleParams {
            vote_period: 5,
            vote_threshold: dec!(0.5),
            accept_list: vec!["ATOM".to_string(), "UMEE".to_string()],
            slash_window: 100_000,
            min_valid_per_window: dec!(0.05),
        }
    }

    #[test]
    fn test_outdated_before_first_update() {
        let cache = ParamCache::new();
        assert!(cache.is_outdated(0));
        assert!(cache.is_outdated(1_000_000));
    }

    #[test]
    fn test_fresh_within_interval() {
        let mut cache = ParamCache::new();
        cache.update(100, params());

        assert!(!cache.is_outdated(100));
        assert!(!cache.is_outdated(250));
        assert!(!cache.is_outdated(300));
        assert!(cache.is_outdated(301));
    }

    #[test]
    fn test_height_regression_forces_refresh() {
        let mut cache = ParamCache::new();
        cache.update(100, params());

        assert!(cache.is_outdated(99));
    }

    #[test]
    fn test_update_replaces_params() {
        let mut cache = ParamCache::new();
        cache.update(100, params());
        assert_eq!(cache.params().unwrap().vote_period, 5);

        let mut newer = params();
        newer.vote_period = 10;
        cache.update(400, newer);
        assert_eq!(cache.params().unwrap().vote_period, 10);
        assert_eq!(cache.last_updated_block(), 400);
        assert!(!cache.is_outdated(400));
    }
}
