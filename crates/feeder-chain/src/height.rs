//! Cached chain height with a background refresh task.
//!
//! An explicitly constructed component: the owner holds the handle and
//! the cancellation token, so shutdown is deterministic and the cache
//! is testable with a stub source.

use crate::error::{ChainError, ChainResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Wall-clock refresh interval for the cached height.
pub const DEFAULT_HEIGHT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Where the latest block height comes from.
#[async_trait]
pub trait HeightSource: Send + Sync {
    async fn latest_height(&self) -> ChainResult<u64>;
}

#[derive(Debug, Default)]
struct HeightState {
    height: Option<u64>,
    last_error: Option<String>,
}

/// Cached latest observed block height plus the last fetch error.
///
/// Reads go through a reader/writer lock, so concurrent readers never
/// block each other; only the refresh task writes.
pub struct ChainHeightCache {
    state: RwLock<HeightState>,
}

impl ChainHeightCache {
    /// Start the cache with its background refresh task. Canceling
    /// `token` stops the task; the returned handle lets the owner
    /// supervise it.
    pub fn spawn(
        source: Arc<dyn HeightSource>,
        interval: Duration,
        token: CancellationToken,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let cache = Arc::new(Self {
            state: RwLock::new(HeightState::default()),
        });

        let refresher = Arc::clone(&cache);
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!("Chain height refresh stopped");
                        return;
                    }
                    _ = tick.tick() => {
                        refresher.refresh(source.as_ref()).await;
                    }
                }
            }
        });

        (cache, handle)
    }

    async fn refresh(&self, source: &dyn HeightSource) {
        match source.latest_height().await {
            Ok(height) => {
                let mut state = self.state.write();
                state.height = Some(height);
                state.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Chain height refresh failed");
                self.state.write().last_error = Some(e.to_string());
            }
        }
    }

    /// Latest cached height.
    pub fn height(&self) -> ChainResult<u64> {
        let state = self.state.read();
        state.height.ok_or_else(|| ChainError::NoHeight {
            last_error: state.last_error.clone(),
        })
    }

    /// Last refresh error, if the most recent fetch failed.
    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }
}

/// Height source backed by a Tendermint RPC `/status` endpoint.
pub struct RpcHeightSource {
    client: reqwest::Client,
    status_url: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    result: StatusResult,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: String,
}

impl RpcHeightSource {
    pub fn new(rpc_url: impl AsRef<str>, timeout: Duration) -> ChainResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            status_url: format!("{}/status", rpc_url.as_ref().trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl HeightSource for RpcHeightSource {
    async fn latest_height(&self) -> ChainResult<u64> {
        let status: StatusResponse = self
            .client
            .get(&self.status_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        status
            .result
            .sync_info
            .latest_block_height
            .parse()
            .map_err(|_| {
                ChainError::HeightQuery(format!(
                    "unparseable height: {}",
                    status.result.sync_info.latest_block_height
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StubSource {
        height: AtomicU64,
        fail: std::sync::atomic::AtomicBool,
    }

    impl StubSource {
        fn new(height: u64) -> Self {
            Self {
                height: AtomicU64::new(height),
                fail: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl HeightSource for StubSource {
        async fn latest_height(&self) -> ChainResult<u64> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ChainError::HeightQuery("node unreachable".to_string()));
            }
            Ok(self.height.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn test_refresh_and_cancellation() {
        let source = Arc::new(StubSource::new(7));
        let token = CancellationToken::new();
        let (cache, handle) = ChainHeightCache::spawn(
            source.clone(),
            Duration::from_millis(10),
            token.clone(),
        );

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let height = cache.height().unwrap();
        assert!(height >= 7);
        assert!(cache.last_error().is_none());

        token.cancel();
        assert!(tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .is_ok());

        // No further refreshes after cancellation.
        let frozen = cache.height().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.height().unwrap(), frozen);
    }

    #[tokio::test]
    async fn test_error_cached_but_height_retained() {
        let source = Arc::new(StubSource::new(42));
        let token = CancellationToken::new();
        let (cache, handle) =
            ChainHeightCache::spawn(source.clone(), Duration::from_millis(10), token.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.height().is_ok());

        source.fail.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // The stale height stays readable; the failure is surfaced
        // alongside it.
        assert!(cache.height().is_ok());
        assert!(cache.last_error().is_some());

        token.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_no_height_before_first_refresh() {
        let cache = ChainHeightCache {
            state: RwLock::new(HeightState::default()),
        };
        assert!(matches!(
            cache.height(),
            Err(ChainError::NoHeight { last_error: None })
        ));
    }
}
