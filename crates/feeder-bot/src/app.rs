//! Main application orchestration.
//!
//! Builds live providers from the registry, runs the oracle's refresh
//! loop, and keeps the chain caches fresh. All background work hangs
//! off one cancellation token, so shutdown is deterministic.

use crate::config::AppConfig;
use crate::error::AppResult;
use feeder_chain::{ChainHeightCache, ParamCache, ParamsSource, RpcHeightSource};
use feeder_oracle::{generate_exchange_rates_string, Oracle};
use feeder_provider::{Provider, ProviderRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Request timeout for chain height queries.
const HEIGHT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Main application.
pub struct Application {
    config: AppConfig,
    registry: ProviderRegistry,
    /// Chain query client owned by the embedding deployment; params
    /// gating degrades to a log line without one.
    params_source: Option<Arc<dyn ParamsSource>>,
    token: CancellationToken,
}

impl Application {
    /// Create a new application from validated configuration.
    pub fn new(config: AppConfig, registry: ProviderRegistry) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            params_source: None,
            token: CancellationToken::new(),
        })
    }

    /// Attach the chain client used to refresh oracle params.
    pub fn with_params_source(mut self, source: Arc<dyn ParamsSource>) -> Self {
        self.params_source = Some(source);
        self
    }

    /// Token canceling every background task the application owns.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Build live providers and subscribe their assigned pairs.
    async fn build_providers(&self) -> AppResult<Vec<Arc<dyn Provider>>> {
        let assignments = self.config.provider_pairs()?;
        let mut providers = Vec::with_capacity(assignments.len());
        for (name, pairs) in &assignments {
            let provider = self.registry.build(name, pairs)?;
            provider.subscribe_currency_pairs(pairs).await?;
            info!(provider = %name, pairs = pairs.len(), "Provider ready");
            providers.push(provider);
        }
        Ok(providers)
    }

    /// Run the refresh loop until the cancellation token fires.
    pub async fn run(&self) -> AppResult<()> {
        let providers = self.build_providers().await?;
        let oracle = Oracle::new(providers, self.config.oracle_config()?);

        let height_source = Arc::new(RpcHeightSource::new(
            &self.config.chain_rpc_url,
            HEIGHT_QUERY_TIMEOUT,
        )?);
        let (height_cache, height_task) = ChainHeightCache::spawn(
            height_source,
            Duration::from_millis(self.config.height_poll_interval_ms),
            self.token.child_token(),
        );
        let mut param_cache = ParamCache::new();

        let mut tick =
            tokio::time::interval(Duration::from_millis(self.config.price_refresh_interval_ms));
        info!(
            pairs = self.config.pairs.len(),
            "Starting price refresh loop"
        );

        loop {
            tokio::select! {
                () = self.token.cancelled() => {
                    info!("Shutdown requested, stopping refresh loop");
                    break;
                }
                _ = tick.tick() => {
                    if let Err(e) = oracle.set_prices().await {
                        error!(error = %e, "Price sync cycle failed");
                        continue;
                    }
                    let prices = oracle.get_prices();
                    debug!(assets = prices.len(), "Published price snapshot");

                    self.refresh_params(&height_cache, &mut param_cache).await;

                    if param_cache.params().is_some() && !prices.is_empty() {
                        // The artifact the voting client submits verbatim.
                        debug!(
                            rates = %generate_exchange_rates_string(&prices),
                            "Vote payload ready"
                        );
                    }
                }
            }
        }

        let _ = height_task.await;
        Ok(())
    }

    /// Refresh cached oracle params when the cache interval has elapsed
    /// or the observed height regressed.
    async fn refresh_params(&self, height_cache: &ChainHeightCache, param_cache: &mut ParamCache) {
        let height = match height_cache.height() {
            Ok(height) => height,
            Err(e) => {
                debug!(error = %e, "Chain height unavailable");
                return;
            }
        };

        if !param_cache.is_outdated(height) {
            return;
        }

        match &self.params_source {
            Some(source) => match source.oracle_params().await {
                Ok(params) => {
                    info!(height, "Oracle params refreshed");
                    param_cache.update(height, params);
                }
                Err(e) => warn!(error = %e, "Oracle params refresh failed"),
            },
            None => {
                debug!(height, "Oracle params stale; no chain client attached");
            }
        }
    }
}
