/*
[INPUT]:  Symbol identifier and public bullet token
[OUTPUT]: Real-time top-5 order book updates
[POS]:    Examples - WebSocket stream handling
[UPDATE]: When WebSocket API changes
*/

use kucoin_futures_adapter::*;
use tokio::time::{Duration, timeout};

/// Example: stream top-5 order book snapshots for ten seconds
#[tokio::main]
async fn main() -> Result<()> {
    println!("=== KuCoin Futures WebSocket Example ===\n");

    let symbol = std::env::args().nth(1).unwrap_or_else(|| "XBTUSDTM".to_string());

    let mut rest = KucoinFuturesClient::new()?;
    let bullet = rest.bullet_public().await?;
    rest.close();

    let mut ws = KucoinWebSocket::new();
    let mut receiver = ws
        .take_receiver()
        .ok_or_else(|| KucoinError::WebSocket("receiver already taken".into()))?;
    ws.connect(&bullet).await?;
    ws.subscribe_depth5(&symbol).await?;

    let window = timeout(Duration::from_secs(10), async {
        while let Some(message) = receiver.recv().await {
            match message {
                WebSocketMessage::Depth5 { symbol, data } => {
                    let bid = data.bids.first().map(|l| l.price());
                    let ask = data.asks.first().map(|l| l.price());
                    println!("{symbol}: bid={bid:?} ask={ask:?}");
                }
                WebSocketMessage::Error { message, .. } => {
                    eprintln!("stream error: {message}");
                    break;
                }
                WebSocketMessage::Other => {}
            }
        }
    })
    .await;

    if window.is_err() {
        println!("\n✓ 10 second window elapsed");
    }

    ws.unsubscribe_depth5(&symbol).await.ok();
    ws.close().await
}
