//! Application configuration.

use crate::error::{AppError, AppResult};
use feeder_core::CurrencyPair;
use feeder_oracle::{OracleConfig, ProviderPairs};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// One aggregated currency pair and the providers queried for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairConfig {
    pub base: String,
    pub quote: String,
    /// Provider names to query, resolved through the registry.
    pub providers: Vec<String>,
    /// Providers that must survive filtering for the asset to be
    /// published. Default: 1.
    #[serde(default = "default_min_providers")]
    pub min_providers: usize,
}

fn default_min_providers() -> usize {
    1
}

/// Top-level feeder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pairs to aggregate.
    pub pairs: Vec<PairConfig>,
    /// Cadence of the price refresh loop (ms). Default: 5,000.
    #[serde(default = "default_price_refresh_interval_ms")]
    pub price_refresh_interval_ms: u64,
    /// Per-provider fetch timeout inside one cycle (ms). Default: 10,000.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    /// Staleness window for candle-based averaging (s). Default: 600.
    #[serde(default = "default_tvwap_window_secs")]
    pub tvwap_window_secs: u64,
    /// Deviation-filter acceptance band in standard deviations.
    /// Default: 1.
    #[serde(default = "default_deviation_threshold")]
    pub deviation_threshold: Decimal,
    /// Tendermint RPC endpoint for the chain height cache.
    #[serde(default = "default_chain_rpc_url")]
    pub chain_rpc_url: String,
    /// Chain height refresh interval (ms). Default: 5,000.
    #[serde(default = "default_height_poll_interval_ms")]
    pub height_poll_interval_ms: u64,
}

fn default_price_refresh_interval_ms() -> u64 {
    5_000
}

fn default_provider_timeout_ms() -> u64 {
    10_000
}

fn default_tvwap_window_secs() -> u64 {
    600
}

fn default_deviation_threshold() -> Decimal {
    feeder_oracle::default_deviation_threshold()
}

fn default_chain_rpc_url() -> String {
    "http://localhost:26657".to_string()
}

fn default_height_poll_interval_ms() -> u64 {
    5_000
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configured pairs before any network activity.
    pub fn validate(&self) -> AppResult<()> {
        if self.pairs.is_empty() {
            return Err(AppError::Config("no currency pairs configured".to_string()));
        }
        for pair in &self.pairs {
            CurrencyPair::new(&pair.base, &pair.quote)?;
            if pair.providers.is_empty() {
                return Err(AppError::Config(format!(
                    "pair {}{} has no providers",
                    pair.base, pair.quote
                )));
            }
            if pair.min_providers == 0 {
                return Err(AppError::Config(format!(
                    "pair {}{} requires a positive min_providers",
                    pair.base, pair.quote
                )));
            }
        }
        Ok(())
    }

    /// Provider name -> assigned pairs.
    pub fn provider_pairs(&self) -> AppResult<ProviderPairs> {
        let mut assignments = ProviderPairs::new();
        for pair_config in &self.pairs {
            let pair = CurrencyPair::new(&pair_config.base, &pair_config.quote)?;
            for provider in &pair_config.providers {
                assignments
                    .entry(provider.clone())
                    .or_default()
                    .push(pair.clone());
            }
        }
        Ok(assignments)
    }

    /// Base asset -> minimum surviving providers.
    pub fn min_providers(&self) -> HashMap<String, usize> {
        self.pairs
            .iter()
            .map(|p| (p.base.to_uppercase(), p.min_providers))
            .collect()
    }

    /// Assemble the oracle configuration.
    pub fn oracle_config(&self) -> AppResult<OracleConfig> {
        let mut oracle = OracleConfig::new(self.provider_pairs()?);
        oracle.min_providers = self.min_providers();
        oracle.deviation_threshold = self.deviation_threshold;
        oracle.tvwap_window = Duration::from_secs(self.tvwap_window_secs);
        oracle.provider_timeout = Duration::from_millis(self.provider_timeout_ms);
        Ok(oracle)
    }
}
