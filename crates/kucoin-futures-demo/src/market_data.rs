/*
[INPUT]:  KuCoin Futures public WebSocket (bullet token + level2Depth5 topic)
[OUTPUT]: Order book snapshots through the `OrderBookFeed` contract
[POS]:    Data layer - streaming order book feed (no trading logic)
[UPDATE]: When changing subscription channels or connection setup
*/

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use kucoin_futures_adapter::{
    Depth5Data, KucoinError, KucoinFuturesClient, KucoinWebSocket, Result, WebSocketMessage,
};

use crate::gateway::{BookLevel, BookUpdate, OrderBookFeed};

/// Order book feed over the public WebSocket.
///
/// Construction is offline; the bullet token is requested and the socket
/// opened on the first subscription.
#[derive(Debug)]
pub struct KucoinFeed {
    rest: KucoinFuturesClient,
    ws: KucoinWebSocket,
    receiver: Option<mpsc::Receiver<WebSocketMessage>>,
}

impl KucoinFeed {
    pub fn new(rest: KucoinFuturesClient) -> Self {
        let mut ws = KucoinWebSocket::new();
        let receiver = ws.take_receiver();
        Self { rest, ws, receiver }
    }

    async fn ensure_connected(&mut self) -> Result<()> {
        if self.ws.is_connected().await {
            return Ok(());
        }
        let bullet = self.rest.bullet_public().await?;
        info!(servers = bullet.instance_servers.len(), "bullet token acquired");
        self.ws.connect(&bullet).await
    }
}

#[async_trait]
impl OrderBookFeed for KucoinFeed {
    async fn subscribe(&mut self, symbol: &str) -> Result<()> {
        self.ensure_connected().await?;
        self.ws.subscribe_depth5(symbol).await
    }

    async fn next_update(&mut self) -> Result<BookUpdate> {
        let receiver = self
            .receiver
            .as_mut()
            .ok_or_else(|| KucoinError::WebSocket("feed receiver unavailable".into()))?;

        loop {
            match receiver.recv().await {
                Some(WebSocketMessage::Depth5 { symbol, data }) => {
                    return Ok(book_update_from(symbol, data));
                }
                Some(WebSocketMessage::Error { code, message }) => {
                    warn!(code = ?code, error = %message, "feed reported error");
                    return Err(KucoinError::WebSocket(message));
                }
                Some(WebSocketMessage::Other) => continue,
                None => return Err(KucoinError::WebSocket("feed channel closed".into())),
            }
        }
    }

    async fn unsubscribe(&mut self, symbol: &str) -> Result<()> {
        self.ws.unsubscribe_depth5(symbol).await
    }

    async fn close(&mut self) -> Result<()> {
        self.rest.close();
        let result = self.ws.close().await;
        debug!(ok = result.is_ok(), "feed closed");
        result
    }
}

fn book_update_from(symbol: String, data: Depth5Data) -> BookUpdate {
    BookUpdate {
        symbol,
        sequence: data.sequence,
        bids: data.bids.iter().map(BookLevel::from).collect(),
        asks: data.asks.iter().map(BookLevel::from).collect(),
    }
}
