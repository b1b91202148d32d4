/*
[INPUT]:  Symbol identifiers and query parameters
[OUTPUT]: Market data (contracts, 24h stats, depth, WebSocket token)
[POS]:    HTTP layer - public market data endpoints (no auth required)
[UPDATE]: When adding new public endpoints or changing response format
*/

use crate::http::{Result, KucoinFuturesClient};
use crate::types::{BulletToken, Contract, DepthBook};
use reqwest::Method;

impl KucoinFuturesClient {
    /// Query all active contracts, in exchange order
    ///
    /// GET /api/v1/contracts/active
    pub async fn get_active_contracts(&self) -> Result<Vec<Contract>> {
        let builder = self.public_request(Method::GET, "/api/v1/contracts/active")?;
        self.send_json(builder).await
    }

    /// Query a single contract with its rolling 24h statistics
    ///
    /// GET /api/v1/contracts/{symbol}
    pub async fn get_contract(&self, symbol: &str) -> Result<Contract> {
        let endpoint = format!("/api/v1/contracts/{}", symbol);
        let builder = self.public_request(Method::GET, &endpoint)?;
        self.send_json(builder).await
    }

    /// Query a level-2 snapshot truncated to `depth` levels per side
    ///
    /// GET /api/v1/level2/depth20?symbol={symbol} (depth100 above 20 levels)
    pub async fn get_depth_book(&self, symbol: &str, depth: usize) -> Result<DepthBook> {
        let levels = if depth <= 20 { 20 } else { 100 };
        let endpoint = format!("/api/v1/level2/depth{}?symbol={}", levels, symbol);
        let builder = self.public_request(Method::GET, &endpoint)?;
        let mut book: DepthBook = self.send_json(builder).await?;
        book.bids.truncate(depth);
        book.asks.truncate(depth);
        Ok(book)
    }

    /// Request a token for the public WebSocket feed
    ///
    /// POST /api/v1/bullet-public
    pub async fn bullet_public(&self) -> Result<BulletToken> {
        let builder = self.public_request(Method::POST, "/api/v1/bullet-public")?;
        self.send_json(builder).await
    }
}
