/*
[INPUT]:  KuCoin Futures REST client and demo configuration
[OUTPUT]: Exchange-neutral account and market views behind async traits
[POS]:    Collaborator layer - request-style gateway, feed contract, client factory
[UPDATE]: When the session needs new data or a client is constructed differently
*/

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kucoin_futures_adapter::{
    ClientConfig, Contract, Credentials, DepthLevel, Fill, InstrumentKind, KucoinFuturesClient,
    Order, Position, Result, Side,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::DemoConfig;
use crate::market_data::KucoinFeed;

#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub currency: String,
    pub total: Decimal,
    pub free: Decimal,
}

/// Rolling 24h statistics of one contract
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub symbol: String,
    pub last: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub volume: Option<Decimal>,
    /// Percent, 1.23 means +1.23%
    pub change_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl From<&DepthLevel> for BookLevel {
    fn from(level: &DepthLevel) -> Self {
        Self {
            price: level.price(),
            size: level.size(),
        }
    }
}

/// Bids best-first (descending), asks best-first (ascending)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderBook {
    pub symbol: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub id: String,
    pub order_type: String,
    pub side: Side,
    pub price: Option<Decimal>,
    pub amount: Decimal,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: String,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub cost: Option<Decimal>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "long"),
            PositionSide::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionView {
    pub symbol: String,
    /// Signed contract count, negative for short
    pub contracts: Decimal,
    pub entry_price: Option<Decimal>,
    pub mark_price: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    /// Percent
    pub pnl_pct: Option<Decimal>,
}

impl PositionView {
    pub fn side(&self) -> Option<PositionSide> {
        if self.contracts.is_zero() {
            None
        } else if self.contracts.is_sign_negative() {
            Some(PositionSide::Short)
        } else {
            Some(PositionSide::Long)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketInfo {
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub kind: Option<InstrumentKind>,
    pub active: bool,
}

/// One order book snapshot pushed by the feed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BookUpdate {
    pub symbol: String,
    pub sequence: Option<u64>,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Request-style collaborator: point-in-time account and market data
#[async_trait]
pub trait MarketGateway: Send + Sync {
    /// Balance per configured settlement currency.
    ///
    /// A currency whose query fails is skipped; the call fails only when
    /// every currency fails.
    async fn fetch_balances(&self) -> Result<Vec<Balance>>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker>;

    async fn fetch_order_book(&self, symbol: &str, depth: usize) -> Result<OrderBook>;

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>>;

    /// Most recent fills first, at most `limit`
    async fn fetch_recent_fills(&self, symbol: &str, limit: usize) -> Result<Vec<Trade>>;

    async fn fetch_positions(&self, symbols: &[String]) -> Result<Vec<PositionView>>;

    /// Full contract catalog in exchange order
    async fn fetch_markets(&self) -> Result<Vec<MarketInfo>>;

    async fn close(&mut self) -> Result<()>;
}

/// Streaming-style collaborator: order book snapshots for one symbol
#[async_trait]
pub trait OrderBookFeed: Send {
    async fn subscribe(&mut self, symbol: &str) -> Result<()>;

    /// Wait for the next snapshot. Blocks until one arrives or the stream fails.
    async fn next_update(&mut self) -> Result<BookUpdate>;

    async fn unsubscribe(&mut self, symbol: &str) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Builds the two collaborators of a session
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create_gateway(
        &self,
        config: &DemoConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn MarketGateway>>;

    async fn create_feed(&self, config: &DemoConfig) -> Result<Box<dyn OrderBookFeed>>;
}

/// [`MarketGateway`] backed by the KuCoin Futures REST API
#[derive(Debug)]
pub struct KucoinGateway {
    client: KucoinFuturesClient,
    balance_currencies: Vec<String>,
}

impl KucoinGateway {
    pub fn new(client: KucoinFuturesClient, balance_currencies: Vec<String>) -> Self {
        Self {
            client,
            balance_currencies,
        }
    }
}

#[async_trait]
impl MarketGateway for KucoinGateway {
    async fn fetch_balances(&self) -> Result<Vec<Balance>> {
        let mut balances = Vec::with_capacity(self.balance_currencies.len());
        let mut first_error = None;
        for currency in &self.balance_currencies {
            match self.client.account_overview(currency).await {
                Ok(overview) => balances.push(Balance {
                    currency: overview.currency,
                    total: overview.account_equity,
                    free: overview.available_balance,
                }),
                Err(err) => {
                    warn!(currency = %currency, error = %err, "account overview failed, skipping currency");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) if balances.is_empty() => Err(err),
            _ => Ok(balances),
        }
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        let contract = self.client.get_contract(symbol).await?;
        Ok(ticker_from_contract(contract))
    }

    async fn fetch_order_book(&self, symbol: &str, depth: usize) -> Result<OrderBook> {
        let book = self.client.get_depth_book(symbol, depth).await?;
        Ok(OrderBook {
            symbol: book.symbol,
            bids: book.bids.iter().map(BookLevel::from).collect(),
            asks: book.asks.iter().map(BookLevel::from).collect(),
        })
    }

    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>> {
        let page = self.client.active_orders(Some(symbol), None).await?;
        Ok(page.into_items().into_iter().map(open_order_from).collect())
    }

    async fn fetch_recent_fills(&self, symbol: &str, limit: usize) -> Result<Vec<Trade>> {
        let page_size = u32::try_from(limit).unwrap_or(u32::MAX);
        let page = self.client.fills(Some(symbol), Some(page_size)).await?;
        Ok(page
            .into_items()
            .into_iter()
            .take(limit)
            .map(trade_from_fill)
            .collect())
    }

    async fn fetch_positions(&self, symbols: &[String]) -> Result<Vec<PositionView>> {
        let mut positions = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            positions.push(position_view_from(self.client.position(symbol).await?));
        }
        Ok(positions)
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketInfo>> {
        let contracts = self.client.get_active_contracts().await?;
        Ok(contracts.into_iter().map(market_from_contract).collect())
    }

    async fn close(&mut self) -> Result<()> {
        self.client.close();
        Ok(())
    }
}

fn ticker_from_contract(contract: Contract) -> Ticker {
    Ticker {
        symbol: contract.symbol,
        last: contract.last_trade_price,
        high: contract.high_price,
        low: contract.low_price,
        volume: contract.volume_of_24h,
        change_pct: contract.price_chg_pct.map(|ratio| ratio * Decimal::ONE_HUNDRED),
    }
}

fn open_order_from(order: Order) -> OpenOrder {
    OpenOrder {
        id: order.id,
        order_type: order.order_type.to_string(),
        side: order.side,
        price: order.price,
        amount: order.size,
        status: order.status.to_string(),
    }
}

fn trade_from_fill(fill: Fill) -> Trade {
    let timestamp = fill
        .timestamp_ms()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    Trade {
        id: fill.trade_id,
        side: fill.side,
        price: fill.price,
        amount: fill.size,
        cost: fill.value,
        timestamp,
    }
}

fn position_view_from(position: Position) -> PositionView {
    PositionView {
        symbol: position.symbol,
        contracts: position.current_qty,
        entry_price: position.avg_entry_price,
        mark_price: position.mark_price,
        unrealized_pnl: position.unrealised_pnl,
        pnl_pct: position
            .unrealised_pnl_pcnt
            .map(|ratio| ratio * Decimal::ONE_HUNDRED),
    }
}

fn market_from_contract(contract: Contract) -> MarketInfo {
    MarketInfo {
        active: contract.is_open(),
        kind: contract.contract_type.kind(),
        symbol: contract.symbol,
        base: contract.base_currency,
        quote: contract.quote_currency,
    }
}

/// Builds KuCoin REST and WebSocket collaborators from configuration
#[derive(Debug, Default, Clone, Copy)]
pub struct KucoinClientFactory;

impl KucoinClientFactory {
    fn rest_client(config: &DemoConfig) -> Result<KucoinFuturesClient> {
        let client_config = ClientConfig {
            timeout: config.request_timeout(),
            ..ClientConfig::default()
        };
        KucoinFuturesClient::with_config_and_base_url(client_config, &config.rest_base_url)
    }
}

#[async_trait]
impl ClientFactory for KucoinClientFactory {
    async fn create_gateway(
        &self,
        config: &DemoConfig,
        credentials: &Credentials,
    ) -> Result<Box<dyn MarketGateway>> {
        let client = Self::rest_client(config)?.with_credentials(credentials.clone());
        debug!(base_url = %client.base_url(), "rest gateway constructed");
        Ok(Box::new(KucoinGateway::new(
            client,
            config.balance_currencies.clone(),
        )))
    }

    async fn create_feed(&self, config: &DemoConfig) -> Result<Box<dyn OrderBookFeed>> {
        Ok(Box::new(KucoinFeed::new(Self::rest_client(config)?)))
    }
}
