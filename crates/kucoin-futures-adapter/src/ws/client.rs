/*
[INPUT]:  Bullet token (endpoint, token, ping interval) and topic subscriptions
[OUTPUT]: Real-time order book updates via channels
[POS]:    WebSocket layer - real-time data stream handling
[UPDATE]: When adding new channels or changing connection logic
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::http::{KucoinError, Result};
use crate::types::BulletToken;

use super::message::{DEPTH5_TOPIC_PREFIX, Depth5Data, ServerFrame, depth5_topic, topic_symbol};

const WELCOME_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);
const CHANNEL_CAPACITY: usize = 100;
const UNKNOWN_LOG_LIMIT: usize = 3;
const PARSE_FAIL_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static UNKNOWN_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);
static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Messages delivered to the consumer
#[derive(Debug, Clone, PartialEq)]
pub enum WebSocketMessage {
    Depth5 { symbol: String, data: Depth5Data },
    Error { code: Option<i64>, message: String },
    Other,
}

/// WebSocket client for the KuCoin Futures feed
#[derive(Debug)]
pub struct KucoinWebSocket {
    message_tx: mpsc::Sender<WebSocketMessage>,
    message_rx: Option<mpsc::Receiver<WebSocketMessage>>,
    outbound_tx: Arc<Mutex<Option<mpsc::Sender<WsMessage>>>>,
    io_task: Mutex<Option<JoinHandle<()>>>,
}

impl KucoinWebSocket {
    /// Create a new WebSocket client
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            message_tx: tx,
            message_rx: Some(rx),
            outbound_tx: Arc::new(Mutex::new(None)),
            io_task: Mutex::new(None),
        }
    }

    /// Get the message receiver
    pub fn take_receiver(&mut self) -> Option<mpsc::Receiver<WebSocketMessage>> {
        self.message_rx.take()
    }

    pub async fn is_connected(&self) -> bool {
        self.outbound_tx.lock().await.is_some()
    }

    /// Connect using the first instance server of a bullet token
    pub async fn connect(&self, bullet: &BulletToken) -> Result<()> {
        let server = bullet
            .instance_servers
            .first()
            .ok_or_else(|| KucoinError::InvalidResponse("bullet token has no instance servers".into()))?;
        self.connect_endpoint(
            &server.endpoint,
            &bullet.token,
            Duration::from_millis(server.ping_interval),
        )
        .await
    }

    /// Connect to an explicit endpoint and wait for the server welcome
    pub async fn connect_endpoint(
        &self,
        endpoint: &str,
        token: &str,
        ping_interval: Duration,
    ) -> Result<()> {
        let mut guard = self.outbound_tx.lock().await;
        if guard.is_some() {
            return Err(KucoinError::WebSocket("WebSocket already connected".into()));
        }

        let connect_id = Uuid::new_v4().to_string();
        let url = format!("{endpoint}?token={token}&connectId={connect_id}");
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|err| KucoinError::WebSocket(err.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        tokio::time::timeout(WELCOME_TIMEOUT, async {
            while let Some(frame) = read.next().await {
                let frame = frame.map_err(|err| KucoinError::WebSocket(err.to_string()))?;
                let Some(text) = frame_text(frame) else {
                    continue;
                };
                match serde_json::from_str::<ServerFrame>(&text) {
                    Ok(ServerFrame::Welcome { .. }) => return Ok(()),
                    Ok(ServerFrame::Error { code, data, .. }) => {
                        return Err(KucoinError::WebSocket(format!(
                            "connection rejected (code {}): {}",
                            code.unwrap_or_default(),
                            error_text(data.as_ref())
                        )));
                    }
                    _ => continue,
                }
            }
            Err::<(), KucoinError>(KucoinError::WebSocket("connection closed before welcome".into()))
        })
        .await
        .map_err(|_| KucoinError::Timeout {
            duration: WELCOME_TIMEOUT.as_secs(),
        })??;

        info!(connect_id = %connect_id, ping_interval_ms = ping_interval.as_millis() as u64, "ws connected");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsMessage>(CHANNEL_CAPACITY);
        *guard = Some(outbound_tx);
        drop(guard);

        let message_tx = self.message_tx.clone();
        let outbound_state = self.outbound_tx.clone();

        let handle = tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(ping_interval.max(MIN_PING_INTERVAL));
            heartbeat.tick().await;

            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(message) => {
                                if write.send(message).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                        }
                    }
                    _ = heartbeat.tick() => {
                        let ping = serde_json::json!({
                            "id": Uuid::new_v4().to_string(),
                            "type": "ping",
                        });
                        if write.send(WsMessage::Text(ping.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    incoming = read.next() => {
                        match incoming {
                            Some(Ok(WsMessage::Close(_))) => {
                                debug!("ws close frame received");
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                            Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                            Some(Ok(message)) => {
                                if let Some(parsed) = Self::parse_message(message)
                                    && message_tx.send(parsed).await.is_err()
                                {
                                    break;
                                }
                            }
                            Some(Err(err)) => {
                                warn!(error = %err, "ws read failed");
                                let _ = message_tx
                                    .send(WebSocketMessage::Error { code: None, message: err.to_string() })
                                    .await;
                                break;
                            }
                            None => {
                                let _ = message_tx
                                    .send(WebSocketMessage::Error {
                                        code: None,
                                        message: "connection closed by server".into(),
                                    })
                                    .await;
                                break;
                            }
                        }
                    }
                }
            }

            let mut guard = outbound_state.lock().await;
            *guard = None;
        });

        *self.io_task.lock().await = Some(handle);
        Ok(())
    }

    /// Subscribe to top-5 order book snapshots for a symbol
    pub async fn subscribe_depth5(&self, symbol: &str) -> Result<()> {
        self.send_topic("subscribe", &depth5_topic(symbol)).await
    }

    /// Unsubscribe from top-5 order book snapshots
    pub async fn unsubscribe_depth5(&self, symbol: &str) -> Result<()> {
        self.send_topic("unsubscribe", &depth5_topic(symbol)).await
    }

    /// Send a Close frame and wait for the I/O task to finish. Safe to call repeatedly.
    pub async fn close(&self) -> Result<()> {
        let sender = self.outbound_tx.lock().await.take();
        drop(sender);

        let handle = self.io_task.lock().await.take();
        if let Some(handle) = handle {
            match tokio::time::timeout(CLOSE_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!("ws io task finished"),
                Ok(Err(err)) => {
                    return Err(KucoinError::WebSocket(format!("io task failed: {err}")));
                }
                Err(_) => {
                    return Err(KucoinError::Timeout {
                        duration: CLOSE_TIMEOUT.as_secs(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn send_topic(&self, action: &'static str, topic: &str) -> Result<()> {
        let sender = {
            let guard = self.outbound_tx.lock().await;
            guard
                .clone()
                .ok_or_else(|| KucoinError::WebSocket("WebSocket not connected".into()))?
        };

        let message = serde_json::json!({
            "id": Uuid::new_v4().to_string(),
            "type": action,
            "topic": topic,
            "privateChannel": false,
            "response": true,
        });

        sender
            .send(WsMessage::Text(message.to_string().into()))
            .await
            .map_err(|_| KucoinError::WebSocket("WebSocket send channel closed".into()))?;

        info!(action, topic, "ws subscription sent");
        Ok(())
    }

    fn parse_message(message: WsMessage) -> Option<WebSocketMessage> {
        let text = frame_text(message)?;

        match serde_json::from_str::<ServerFrame>(&text) {
            Ok(ServerFrame::Message { topic, data, .. }) if topic.starts_with(DEPTH5_TOPIC_PREFIX) => {
                let symbol = topic_symbol(&topic).unwrap_or_default().to_string();
                match serde_json::from_value::<Depth5Data>(data) {
                    Ok(data) => Some(WebSocketMessage::Depth5 { symbol, data }),
                    Err(err) => {
                        log_parse_fail_once(&err, &text);
                        Some(WebSocketMessage::Other)
                    }
                }
            }
            Ok(ServerFrame::Error { code, data, .. }) => Some(WebSocketMessage::Error {
                code,
                message: error_text(data.as_ref()),
            }),
            Ok(ServerFrame::Ack { .. }) | Ok(ServerFrame::Pong { .. }) | Ok(ServerFrame::Welcome { .. }) => None,
            Ok(_) => {
                log_unknown_once(&text);
                Some(WebSocketMessage::Other)
            }
            Err(err) => {
                log_parse_fail_once(&err, &text);
                Some(WebSocketMessage::Other)
            }
        }
    }
}

impl Default for KucoinWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

fn frame_text(message: WsMessage) -> Option<String> {
    match message {
        WsMessage::Text(text) => Some(text.to_string()),
        WsMessage::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}

fn error_text(data: Option<&serde_json::Value>) -> String {
    match data {
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "unknown error".to_string(),
    }
}

fn log_unknown_once(raw: &str) {
    let count = UNKNOWN_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < UNKNOWN_LOG_LIMIT {
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(
            sample_index = count + 1,
            sample_limit = UNKNOWN_LOG_LIMIT,
            bytes = raw.len(),
            message = %preview,
            "ws message topic unrecognized"
        );
    }
}

fn log_parse_fail_once(err: &serde_json::Error, raw: &str) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "ws message parse failed"
        );
        let preview = truncate_for_log(raw, RAW_LOG_MAX_BYTES);
        debug!(message = %preview, "ws message parse failed (raw)");
    }
}

fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
