//! Stream controller lifecycle.
//!
//! Handles connection lifecycle for a single streaming data source:
//! connect, send the complete current subscription set, read frames into
//! the provider-supplied handler, and reconnect on a fixed retry tick
//! after any read error or missed keep-alive. Cancellation of the owning
//! token is the only terminal transition.

use crate::error::{WsError, WsResult};
use crate::keepalive::{Keepalive, PingSpec};
use feeder_telemetry::metrics;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fixed delay before a reconnect attempt.
const DEFAULT_RETRY_TICK: Duration = Duration::from_secs(5);

/// Inbound silence treated as a missed keep-alive.
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

/// Capacity of the live-send queue for subscription messages added
/// while connected.
const OUTBOUND_QUEUE: usize = 64;

/// Stream controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Subscribed,
    Reading,
}

/// Handler for inbound frames, supplied by the owning provider.
///
/// Implementations must not perform network I/O; they only update the
/// provider's protected price maps. Protocol-level heartbeats that need
/// a payload reply are detected and answered here via the controller's
/// outbound queue.
pub trait MessageHandler: Send + Sync {
    fn on_message(&self, payload: &str);
}

/// Connection configuration for one streaming source.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Provider name, used as the metrics/log label.
    pub provider: String,
    /// WebSocket URL.
    pub url: String,
    /// Outbound keep-alive ping, if the venue expects one.
    pub ping: Option<PingSpec>,
    /// Inbound silence treated as a missed keep-alive.
    pub stale_after: Duration,
    /// Fixed delay between reconnect attempts.
    pub retry_tick: Duration,
}

impl StreamConfig {
    pub fn new(provider: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            url: url.into(),
            ping: None,
            stale_after: DEFAULT_STALE_AFTER,
            retry_tick: DEFAULT_RETRY_TICK,
        }
    }
}

/// Resilient stream controller for a single connection.
pub struct StreamController {
    config: StreamConfig,
    state: Arc<RwLock<StreamState>>,
    /// Complete current subscription set, replayed on every (re)connect.
    subscriptions: Arc<RwLock<Vec<String>>>,
    handler: Arc<dyn MessageHandler>,
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: Arc<TokioMutex<mpsc::Receiver<String>>>,
    token: CancellationToken,
}

impl StreamController {
    /// Create a controller with its initial subscription messages.
    ///
    /// An empty subscription set is a configuration error: the feeder
    /// refuses it before any network activity.
    pub fn new(
        config: StreamConfig,
        subscription_msgs: Vec<String>,
        handler: Arc<dyn MessageHandler>,
        token: CancellationToken,
    ) -> WsResult<Self> {
        if subscription_msgs.is_empty() {
            return Err(WsError::EmptySubscriptions);
        }
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        Ok(Self {
            config,
            state: Arc::new(RwLock::new(StreamState::Disconnected)),
            subscriptions: Arc::new(RwLock::new(subscription_msgs)),
            handler,
            outbound_tx,
            outbound_rx: Arc::new(TokioMutex::new(outbound_rx)),
            token,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        *self.state.read()
    }

    /// Snapshot of the current subscription set.
    pub fn subscription_msgs(&self) -> Vec<String> {
        self.subscriptions.read().clone()
    }

    /// Queue an outbound frame on the live connection, e.g. a heartbeat
    /// reply the venue expects from the message handler.
    pub fn send_raw(&self, msg: String) {
        let _ = self.outbound_tx.try_send(msg);
    }

    /// Thread-safe append to the live subscription set.
    ///
    /// Messages are sent immediately when connected; reconnection always
    /// replays the complete current set, so nothing is lost if the
    /// connection is down.
    pub fn add_subscription_msgs(&self, msgs: Vec<String>) {
        if msgs.is_empty() {
            return;
        }
        self.subscriptions.write().extend(msgs.iter().cloned());
        for msg in msgs {
            let _ = self.outbound_tx.try_send(msg);
        }
    }

    /// Spawn the controller loop on the runtime.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let ctrl = Arc::clone(self);
        tokio::spawn(async move { ctrl.start().await })
    }

    /// Connect, subscribe and read until the owning token is cancelled.
    ///
    /// Every disconnect (read error, server close, missed keep-alive)
    /// re-enters `Connecting` after the fixed retry tick and reports a
    /// reconnect event.
    pub async fn start(&self) {
        loop {
            if self.token.is_cancelled() {
                *self.state.write() = StreamState::Disconnected;
                return;
            }

            *self.state.write() = StreamState::Connecting;

            match self.connect_and_read().await {
                Ok(()) => {
                    // Only cancellation exits the read loop cleanly.
                    *self.state.write() = StreamState::Disconnected;
                    return;
                }
                Err(e) => {
                    warn!(
                        provider = %self.config.provider,
                        error = %e,
                        "Stream disconnected"
                    );
                }
            }

            *self.state.write() = StreamState::Disconnected;
            metrics::record_reconnect(&self.config.provider);

            tokio::select! {
                () = tokio::time::sleep(self.config.retry_tick) => {}
                () = self.token.cancelled() => {
                    return;
                }
            }
        }
    }

    async fn connect_and_read(&self) -> WsResult<()> {
        debug!(provider = %self.config.provider, url = %self.config.url, "Connecting");

        let (ws_stream, _) = connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        // Drop frames queued while disconnected; the full-set replay
        // below supersedes them.
        {
            let mut rx = self.outbound_rx.lock().await;
            while rx.try_recv().is_ok() {}
        }

        let msgs = self.subscriptions.read().clone();
        for msg in &msgs {
            write.send(Message::Text(msg.clone())).await?;
        }
        *self.state.write() = StreamState::Subscribed;
        info!(
            provider = %self.config.provider,
            subscriptions = msgs.len(),
            "Subscribed"
        );

        let mut keepalive = Keepalive::new(self.config.stale_after);
        let check_interval = self
            .config
            .ping
            .as_ref()
            .map(|p| p.interval / 2)
            .unwrap_or(self.config.stale_after / 4)
            .max(Duration::from_millis(10));

        *self.state.write() = StreamState::Reading;

        loop {
            let outbound_recv = async { self.outbound_rx.lock().await.recv().await };

            tokio::select! {
                () = self.token.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(provider = %self.config.provider, error = %e, "Close frame failed");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            keepalive.record_inbound();
                            self.handler.on_message(&text);
                        }
                        Some(Ok(Message::Binary(data))) => {
                            keepalive.record_inbound();
                            self.handler.on_message(&String::from_utf8_lossy(&data));
                        }
                        Some(Ok(Message::Ping(data))) => {
                            keepalive.record_inbound();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            keepalive.record_inbound();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Closed by server".to_string()));
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            return Err(WsError::ConnectionClosed {
                                code: 1006,
                                reason: "Stream ended".to_string(),
                            });
                        }
                    }
                }

                outbound = outbound_recv => {
                    if let Some(msg) = outbound {
                        write.send(Message::Text(msg)).await?;
                    }
                }

                () = tokio::time::sleep(check_interval) => {
                    if keepalive.is_stale() {
                        return Err(WsError::KeepAliveTimeout);
                    }
                    if let Some(ping) = &self.config.ping {
                        if keepalive.should_ping(ping.interval) {
                            write.send(ping.frame.to_message()).await?;
                            keepalive.record_ping();
                        }
                    }
                }
            }
        }
    }
}

/// Multi-socket variant for venues with multiplexing limits.
///
/// Opens one dedicated controller (and connection) per subscription
/// message instead of sharing a socket. All controllers share the
/// parent cancellation token.
pub struct MultiStreamController {
    config: StreamConfig,
    handler: Arc<dyn MessageHandler>,
    token: CancellationToken,
    controllers: RwLock<Vec<Arc<StreamController>>>,
}

impl MultiStreamController {
    pub fn new(
        config: StreamConfig,
        handler: Arc<dyn MessageHandler>,
        token: CancellationToken,
    ) -> Self {
        Self {
            config,
            handler,
            token,
            controllers: RwLock::new(Vec::new()),
        }
    }

    /// Open and spawn one controller per subscription message.
    pub fn add_subscription_msgs(&self, msgs: Vec<String>) -> WsResult<Vec<JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(msgs.len());
        for msg in msgs {
            let ctrl = Arc::new(StreamController::new(
                self.config.clone(),
                vec![msg],
                Arc::clone(&self.handler),
                self.token.child_token(),
            )?);
            handles.push(ctrl.spawn());
            self.controllers.write().push(ctrl);
        }
        Ok(handles)
    }

    /// Number of open controllers.
    pub fn controller_count(&self) -> usize {
        self.controllers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NopHandler;

    impl MessageHandler for NopHandler {
        fn on_message(&self, _payload: &str) {}
    }

    fn test_config() -> StreamConfig {
        StreamConfig::new("test", "ws://127.0.0.1:1")
    }

    #[test]
    fn test_empty_subscription_set_rejected() {
        let result = StreamController::new(
            test_config(),
            Vec::new(),
            Arc::new(NopHandler),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(WsError::EmptySubscriptions)));
    }

    #[test]
    fn test_initial_state_disconnected() {
        let ctrl = StreamController::new(
            test_config(),
            vec!["sub".to_string()],
            Arc::new(NopHandler),
            CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(ctrl.state(), StreamState::Disconnected);
    }

    #[test]
    fn test_add_subscription_msgs_grows_set() {
        let ctrl = StreamController::new(
            test_config(),
            vec!["a".to_string()],
            Arc::new(NopHandler),
            CancellationToken::new(),
        )
        .unwrap();

        ctrl.add_subscription_msgs(vec!["b".to_string(), "c".to_string()]);
        assert_eq!(ctrl.subscription_msgs(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_multi_controller_one_socket_per_msg() {
        let multi = MultiStreamController::new(
            test_config(),
            Arc::new(NopHandler),
            CancellationToken::new(),
        );
        let handles = multi
            .add_subscription_msgs(vec!["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(multi.controller_count(), 2);
        assert_eq!(handles.len(), 2);
        for h in handles {
            h.abort();
        }
    }
}
