//! Reconnect-and-resubscribe integration tests against an in-process
//! WebSocket server.

use feeder_ws::{MessageHandler, StreamConfig, StreamController};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// Mock server that drops every connection shortly after accepting it,
/// recording the messages each connection received.
struct MockWsServer {
    addr: SocketAddr,
    /// Messages received, grouped by connection in accept order.
    by_connection: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockWsServer {
    async fn start(close_after: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let by_connection: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

        let recorded = by_connection.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let idx = {
                    let mut conns = recorded.lock();
                    conns.push(Vec::new());
                    conns.len() - 1
                };
                let recorded = recorded.clone();
                tokio::spawn(handle_connection(stream, recorded, idx, close_after));
            }
        });

        Self {
            addr,
            by_connection,
        }
    }

    fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    fn connection_count(&self) -> usize {
        self.by_connection.lock().len()
    }

    fn messages_for(&self, connection: usize) -> Vec<String> {
        self.by_connection
            .lock()
            .get(connection)
            .cloned()
            .unwrap_or_default()
    }
}

async fn handle_connection(
    stream: TcpStream,
    recorded: Arc<Mutex<Vec<Vec<String>>>>,
    idx: usize,
    close_after: Duration,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(_) => return,
    };
    let (mut write, mut read) = ws_stream.split();
    let deadline = tokio::time::sleep(close_after);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        recorded.lock()[idx].push(text.clone());
                        // Answer every subscription with one price frame.
                        let _ = write.send(Message::Text(format!("price:{text}"))).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    _ => {}
                }
            }
            () = &mut deadline => {
                let _ = write.send(Message::Close(None)).await;
                return;
            }
        }
    }
}

/// Handler that keeps a count per payload, standing in for a provider's
/// price map.
struct RecordingHandler {
    seen: Mutex<HashMap<String, u32>>,
}

impl RecordingHandler {
    fn new() -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
        }
    }

    fn count(&self, payload: &str) -> u32 {
        self.seen.lock().get(payload).copied().unwrap_or(0)
    }
}

impl MessageHandler for RecordingHandler {
    fn on_message(&self, payload: &str) {
        *self.seen.lock().entry(payload.to_string()).or_insert(0) += 1;
    }
}

async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let result = tokio::time::timeout(timeout, async {
        loop {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    result.is_ok()
}

#[tokio::test]
async fn test_reconnect_resubscribes_full_set() {
    let server = MockWsServer::start(Duration::from_millis(150)).await;

    let mut config = StreamConfig::new("mock", server.url());
    config.retry_tick = Duration::from_millis(50);

    let handler = Arc::new(RecordingHandler::new());
    let token = CancellationToken::new();
    let ctrl = Arc::new(
        StreamController::new(
            config,
            vec!["sub-A".to_string()],
            handler.clone(),
            token.clone(),
        )
        .unwrap(),
    );
    let handle = ctrl.spawn();

    // The server drops every connection, so the controller must come back.
    assert!(wait_until(Duration::from_secs(10), || server.connection_count() >= 2).await);

    // A pair added mid-stream joins the replayed set on reconnect.
    ctrl.add_subscription_msgs(vec!["sub-B".to_string()]);
    assert!(
        wait_until(Duration::from_secs(10), || {
            let conns = server.connection_count();
            (0..conns).any(|i| {
                let msgs = server.messages_for(i);
                msgs.contains(&"sub-A".to_string()) && msgs.contains(&"sub-B".to_string())
            })
        })
        .await,
        "no reconnect replayed the complete subscription set"
    );

    // Prices acquired before the disconnects are still in the handler's
    // state; reconnects never clear it.
    assert!(handler.count("price:sub-A") >= 2);

    token.cancel();
    assert!(tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_cancellation_is_terminal() {
    let server = MockWsServer::start(Duration::from_secs(30)).await;

    let mut config = StreamConfig::new("mock", server.url());
    config.retry_tick = Duration::from_millis(50);

    let token = CancellationToken::new();
    let ctrl = Arc::new(
        StreamController::new(
            config,
            vec!["sub-A".to_string()],
            Arc::new(RecordingHandler::new()),
            token.clone(),
        )
        .unwrap(),
    );
    let handle = ctrl.spawn();

    assert!(wait_until(Duration::from_secs(10), || server.connection_count() >= 1).await);

    token.cancel();
    assert!(tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .is_ok());
    assert_eq!(ctrl.state(), feeder_ws::StreamState::Disconnected);
}
