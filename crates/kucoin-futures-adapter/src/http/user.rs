/*
[INPUT]:  Query parameters and signed API credentials
[OUTPUT]: User account data (balance, orders, fills, position)
[POS]:    HTTP layer - user data endpoints (require signed headers)
[UPDATE]: When adding new user endpoints or changing query parameters
*/

// ### User Endpoints

use crate::http::{KucoinFuturesClient, Result};
use crate::types::{AccountOverview, BulletToken, Fill, Order, Paginated, Position};
use reqwest::Method;

impl KucoinFuturesClient {
    /// Query the futures account overview for one settlement currency
    ///
    /// GET /api/v1/account-overview?currency={currency}
    pub async fn account_overview(&self, currency: &str) -> Result<AccountOverview> {
        let endpoint = format!("/api/v1/account-overview?currency={}", currency);
        let builder = self.signed_request(Method::GET, &endpoint, None)?;
        self.send_json(builder).await
    }

    /// Query active (open) orders
    ///
    /// GET /api/v1/orders?status=active&symbol={symbol}&pageSize={page_size}
    pub async fn active_orders(
        &self,
        symbol: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<Paginated<Order>> {
        let mut params = vec!["status=active".to_string()];
        if let Some(s) = symbol {
            params.push(format!("symbol={}", s));
        }
        if let Some(size) = page_size {
            params.push(format!("pageSize={}", size));
        }

        let endpoint = format!("/api/v1/orders?{}", params.join("&"));
        let builder = self.signed_request(Method::GET, &endpoint, None)?;
        self.send_json(builder).await
    }

    /// Query recent fills, newest first
    ///
    /// GET /api/v1/fills?symbol={symbol}&pageSize={page_size}
    pub async fn fills(&self, symbol: Option<&str>, page_size: Option<u32>) -> Result<Paginated<Fill>> {
        let mut params = Vec::new();
        if let Some(s) = symbol {
            params.push(format!("symbol={}", s));
        }
        if let Some(size) = page_size {
            params.push(format!("pageSize={}", size));
        }

        let endpoint = if params.is_empty() {
            "/api/v1/fills".to_string()
        } else {
            format!("/api/v1/fills?{}", params.join("&"))
        };

        let builder = self.signed_request(Method::GET, &endpoint, None)?;
        self.send_json(builder).await
    }

    /// Query the position for one symbol
    ///
    /// GET /api/v1/position?symbol={symbol}
    pub async fn position(&self, symbol: &str) -> Result<Position> {
        let endpoint = format!("/api/v1/position?symbol={}", symbol);
        let builder = self.signed_request(Method::GET, &endpoint, None)?;
        self.send_json(builder).await
    }

    /// Request a token for the private WebSocket feed
    ///
    /// POST /api/v1/bullet-private
    pub async fn bullet_private(&self) -> Result<BulletToken> {
        let builder = self.signed_request(Method::POST, "/api/v1/bullet-private", None)?;
        self.send_json(builder).await
    }
}
