/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for kucoin-futures-adapter tests

#![allow(dead_code)]

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use kucoin_futures_adapter::{ClientConfig, Credentials, KucoinFuturesClient};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_credentials() -> Credentials {
    Credentials::new("test-key", "test-secret", "my-passphrase")
}

pub fn client_for(server: &MockServer) -> KucoinFuturesClient {
    KucoinFuturesClient::with_config_and_base_url(ClientConfig::default(), &server.uri())
        .expect("client init")
}

/// Wrap a payload in the `{code, data}` success envelope
pub fn ok_envelope(data: Value) -> Value {
    json!({ "code": "200000", "data": data })
}

pub fn depth5_push(symbol: &str, bid: &str, ask: &str) -> Value {
    json!({
        "type": "message",
        "topic": format!("/contractMarket/level2Depth5:{symbol}"),
        "subject": "level2",
        "data": {
            "bids": [[bid, "1"]],
            "asks": [[ask, "2"]],
            "sequence": 1,
            "timestamp": 1_700_000_000_000i64
        }
    })
}

/// How the scripted feed server behaves once a client is connected
#[derive(Debug, Clone)]
pub enum FeedScript {
    /// Welcome, ack the first request, push the given frames, then idle until closed
    Serve(Vec<Value>),
    /// Welcome, ack the first request, push the given frames, then drop the socket
    ServeThenDrop(Vec<Value>),
    /// Reply to the handshake with an error frame instead of a welcome
    Reject,
}

/// Spawn a single-connection WebSocket server. The handle resolves to every
/// text frame the client sent.
pub async fn spawn_feed_server(script: FeedScript) -> (SocketAddr, JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        let mut received = Vec::new();
        let (stream, _) = listener.accept().await.expect("accept");
        let mut socket = tokio_tungstenite::accept_async(stream).await.expect("handshake");

        let frames = match script {
            FeedScript::Reject => {
                let error = json!({"id": "1", "type": "error", "code": 401, "data": "token is invalid"});
                let _ = socket.send(Message::Text(error.to_string().into())).await;
                return received;
            }
            FeedScript::Serve(ref frames) | FeedScript::ServeThenDrop(ref frames) => frames.clone(),
        };

        let welcome = json!({"id": "welcome-1", "type": "welcome"});
        socket
            .send(Message::Text(welcome.to_string().into()))
            .await
            .expect("send welcome");

        let mut acked = false;
        while let Some(Ok(message)) = socket.next().await {
            match message {
                Message::Text(text) => {
                    let value: Value = serde_json::from_str(&text).expect("client json");
                    let is_request = matches!(
                        value["type"].as_str(),
                        Some("subscribe") | Some("unsubscribe")
                    );
                    let id = value["id"].clone();
                    received.push(value);

                    if is_request && !acked {
                        acked = true;
                        let ack = json!({"id": id, "type": "ack"});
                        let _ = socket.send(Message::Text(ack.to_string().into())).await;
                        for frame in &frames {
                            let _ = socket.send(Message::Text(frame.to_string().into())).await;
                        }
                        if matches!(script, FeedScript::ServeThenDrop(_)) {
                            return received;
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        received
    });

    (addr, handle)
}
