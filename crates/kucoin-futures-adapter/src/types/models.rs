/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{ContractType, OrderStatus, OrderType, Side};

/// Futures account overview for a single settlement currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverview {
    pub currency: String,
    #[serde(default)]
    pub account_equity: Decimal,
    #[serde(rename = "unrealisedPNL", default)]
    pub unrealised_pnl: Decimal,
    #[serde(default)]
    pub margin_balance: Decimal,
    #[serde(default)]
    pub position_margin: Decimal,
    #[serde(default)]
    pub order_margin: Decimal,
    #[serde(default)]
    pub frozen_funds: Decimal,
    #[serde(default)]
    pub available_balance: Decimal,
}

/// Contract definition plus rolling 24h statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub symbol: String,
    #[serde(default)]
    pub root_symbol: Option<String>,
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    pub base_currency: String,
    pub quote_currency: String,
    #[serde(default)]
    pub settle_currency: Option<String>,
    pub status: String,
    #[serde(default)]
    pub multiplier: Option<Decimal>,
    #[serde(default)]
    pub tick_size: Option<Decimal>,
    #[serde(default)]
    pub last_trade_price: Option<Decimal>,
    #[serde(default)]
    pub high_price: Option<Decimal>,
    #[serde(default)]
    pub low_price: Option<Decimal>,
    /// Ratio, 0.0123 means +1.23%
    #[serde(default)]
    pub price_chg_pct: Option<Decimal>,
    #[serde(default)]
    pub volume_of_24h: Option<Decimal>,
    #[serde(default)]
    pub turnover_of_24h: Option<Decimal>,
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    #[serde(default)]
    pub index_price: Option<Decimal>,
}

impl Contract {
    pub fn is_open(&self) -> bool {
        self.status.eq_ignore_ascii_case("open")
    }
}

/// One price level, `[price, size]` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel(pub Decimal, pub Decimal);

impl DepthLevel {
    pub fn price(&self) -> Decimal {
        self.0
    }

    pub fn size(&self) -> Decimal {
        self.1
    }
}

/// Level-2 order book snapshot, bids descending and asks ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthBook {
    pub symbol: String,
    #[serde(default)]
    pub sequence: Option<u64>,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    /// Nanoseconds on REST snapshots
    #[serde(default)]
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub symbol: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: Side,
    #[serde(default)]
    pub price: Option<Decimal>,
    pub size: Decimal,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub deal_size: Option<Decimal>,
    pub status: OrderStatus,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub trade_id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Notional value (cost) of the fill
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    /// Nanoseconds
    #[serde(default)]
    pub trade_time: Option<i64>,
    /// Milliseconds
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Fill {
    /// Fill time in milliseconds, preferring the matching-engine trade time
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.trade_time
            .map(|nanos| nanos / 1_000_000)
            .or(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub id: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub is_open: bool,
    /// Signed contract count, negative for short
    #[serde(default)]
    pub current_qty: Decimal,
    #[serde(default)]
    pub avg_entry_price: Option<Decimal>,
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    #[serde(default)]
    pub unrealised_pnl: Option<Decimal>,
    /// Ratio, 0.05 means +5%
    #[serde(default)]
    pub unrealised_pnl_pcnt: Option<Decimal>,
    #[serde(default)]
    pub unrealised_roe_pcnt: Option<Decimal>,
    #[serde(default)]
    pub liquidation_price: Option<Decimal>,
    #[serde(default)]
    pub real_leverage: Option<Decimal>,
    #[serde(default)]
    pub settle_currency: Option<String>,
}

/// WebSocket server entry returned by the bullet endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceServer {
    pub endpoint: String,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default)]
    pub protocol: String,
    /// Milliseconds
    pub ping_interval: u64,
    /// Milliseconds
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletToken {
    pub token: String,
    pub instance_servers: Vec<InstanceServer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_level_accepts_numbers_and_strings() {
        let book: DepthBook = serde_json::from_str(
            r#"{"symbol":"XBTUSDTM","bids":[[100.005,1.2345],["99.5","2"]],"asks":[]}"#,
        )
        .unwrap();
        assert_eq!(book.bids[0].price(), "100.005".parse::<Decimal>().unwrap());
        assert_eq!(book.bids[1].size(), Decimal::from(2));
        assert!(book.asks.is_empty());
    }

    #[test]
    fn test_fill_timestamp_prefers_trade_time() {
        let fill: Fill = serde_json::from_str(
            r#"{"tradeId":"t1","symbol":"XBTUSDTM","side":"buy","price":"100","size":1,
                "tradeTime":1700000000123456789,"createdAt":1}"#,
        )
        .unwrap();
        assert_eq!(fill.timestamp_ms(), Some(1_700_000_000_123));
    }
}
