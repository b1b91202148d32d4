/*
[INPUT]:  Scripted gateway/feed behaviour for session tests
[OUTPUT]: Mock collaborators, call log, collecting reporter
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When the collaborator traits change
*/

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kucoin_futures_adapter::{Credentials, InstrumentKind, KucoinError, Result};
use kucoin_futures_demo::DemoConfig;
use kucoin_futures_demo::display::{DisplayRecord, Reporter};
use kucoin_futures_demo::gateway::{
    Balance, BookLevel, BookUpdate, ClientFactory, MarketGateway, MarketInfo, OpenOrder,
    OrderBook, OrderBookFeed, PositionView, Ticker, Trade,
};
use rust_decimal::Decimal;

pub fn dec(value: &str) -> Decimal {
    value.parse().expect("decimal")
}

pub fn level(price: &str, size: &str) -> BookLevel {
    BookLevel {
        price: dec(price),
        size: dec(size),
    }
}

pub fn config_with_credentials() -> DemoConfig {
    DemoConfig {
        api_key: Some("key".into()),
        api_secret: Some("secret".into()),
        api_passphrase: Some("phrase".into()),
        watch_duration_secs: 2,
        ..DemoConfig::default()
    }
}

fn failure(message: &str) -> KucoinError {
    KucoinError::InvalidResponse(message.to_string())
}

/// Everything the mocks observed
#[derive(Debug, Default)]
pub struct CallLog {
    pub gateway_created: usize,
    pub feed_created: usize,
    pub gateway_closed: usize,
    pub feed_closed: usize,
    pub subscribed: usize,
    pub unsubscribed: usize,
    pub calls: Vec<&'static str>,
}

pub type SharedLog = Arc<Mutex<CallLog>>;

fn log_call(log: &SharedLog, name: &'static str) {
    log.lock().expect("log lock").calls.push(name);
}

#[derive(Debug, Clone)]
pub struct GatewayScript {
    pub balances: std::result::Result<Vec<Balance>, String>,
    pub ticker: std::result::Result<Ticker, String>,
    pub book: std::result::Result<OrderBook, String>,
    pub orders: std::result::Result<Vec<OpenOrder>, String>,
    pub fills: std::result::Result<Vec<Trade>, String>,
    pub positions: std::result::Result<Vec<PositionView>, String>,
    pub markets: std::result::Result<Vec<MarketInfo>, String>,
    /// Call name that panics instead of answering
    pub panic_on: Option<&'static str>,
    pub close_error: bool,
}

impl Default for GatewayScript {
    fn default() -> Self {
        Self {
            balances: Ok(Vec::new()),
            ticker: Ok(Ticker {
                symbol: "XBTUSDTM".into(),
                last: None,
                high: None,
                low: None,
                volume: None,
                change_pct: None,
            }),
            book: Ok(OrderBook::default()),
            orders: Ok(Vec::new()),
            fills: Ok(Vec::new()),
            positions: Ok(Vec::new()),
            markets: Ok(Vec::new()),
            panic_on: None,
            close_error: false,
        }
    }
}

pub struct MockGateway {
    script: GatewayScript,
    log: SharedLog,
}

impl MockGateway {
    fn answer<T: Clone>(
        &self,
        name: &'static str,
        value: &std::result::Result<T, String>,
    ) -> Result<T> {
        log_call(&self.log, name);
        if self.script.panic_on == Some(name) {
            panic!("scripted panic in {name}");
        }
        value.clone().map_err(|message| failure(&message))
    }
}

#[async_trait]
impl MarketGateway for MockGateway {
    async fn fetch_balances(&self) -> Result<Vec<Balance>> {
        self.answer("balances", &self.script.balances)
    }

    async fn fetch_ticker(&self, _symbol: &str) -> Result<Ticker> {
        self.answer("ticker", &self.script.ticker)
    }

    async fn fetch_order_book(&self, _symbol: &str, _depth: usize) -> Result<OrderBook> {
        self.answer("book", &self.script.book)
    }

    async fn fetch_open_orders(&self, _symbol: &str) -> Result<Vec<OpenOrder>> {
        self.answer("orders", &self.script.orders)
    }

    async fn fetch_recent_fills(&self, _symbol: &str, limit: usize) -> Result<Vec<Trade>> {
        self.answer("fills", &self.script.fills)
            .map(|fills| fills.into_iter().take(limit).collect())
    }

    async fn fetch_positions(&self, _symbols: &[String]) -> Result<Vec<PositionView>> {
        self.answer("positions", &self.script.positions)
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketInfo>> {
        self.answer("markets", &self.script.markets)
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().expect("log lock").gateway_closed += 1;
        if self.script.close_error {
            return Err(failure("gateway close failed"));
        }
        Ok(())
    }
}

/// What the feed does once its scripted updates are exhausted
#[derive(Debug, Clone, Default)]
pub enum FeedEnd {
    #[default]
    Block,
    Fail(String),
}

#[derive(Debug, Clone, Default)]
pub struct FeedScript {
    pub updates: Vec<BookUpdate>,
    pub then: FeedEnd,
    pub subscribe_error: Option<String>,
    pub close_error: bool,
}

pub struct MockFeed {
    pending: VecDeque<BookUpdate>,
    script: FeedScript,
    log: SharedLog,
}

impl MockFeed {
    pub fn new(script: FeedScript, log: SharedLog) -> Self {
        Self {
            pending: script.updates.iter().cloned().collect(),
            script,
            log,
        }
    }
}

#[async_trait]
impl OrderBookFeed for MockFeed {
    async fn subscribe(&mut self, _symbol: &str) -> Result<()> {
        self.log.lock().expect("log lock").subscribed += 1;
        match &self.script.subscribe_error {
            Some(message) => Err(failure(message)),
            None => Ok(()),
        }
    }

    async fn next_update(&mut self) -> Result<BookUpdate> {
        if let Some(update) = self.pending.pop_front() {
            return Ok(update);
        }
        match &self.script.then {
            FeedEnd::Block => std::future::pending().await,
            FeedEnd::Fail(message) => Err(KucoinError::WebSocket(message.clone())),
        }
    }

    async fn unsubscribe(&mut self, _symbol: &str) -> Result<()> {
        self.log.lock().expect("log lock").unsubscribed += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().expect("log lock").feed_closed += 1;
        if self.script.close_error {
            return Err(failure("feed close failed"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    pub gateway: GatewayScript,
    pub feed: FeedScript,
    pub gateway_init_error: bool,
    pub feed_init_error: bool,
    pub log: SharedLog,
}

impl MockFactory {
    pub fn log(&self) -> SharedLog {
        self.log.clone()
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn create_gateway(
        &self,
        _config: &DemoConfig,
        _credentials: &Credentials,
    ) -> Result<Box<dyn MarketGateway>> {
        if self.gateway_init_error {
            return Err(KucoinError::Config("bad base url".into()));
        }
        self.log.lock().expect("log lock").gateway_created += 1;
        Ok(Box::new(MockGateway {
            script: self.gateway.clone(),
            log: self.log.clone(),
        }))
    }

    async fn create_feed(&self, _config: &DemoConfig) -> Result<Box<dyn OrderBookFeed>> {
        if self.feed_init_error {
            return Err(KucoinError::WebSocket("no endpoint".into()));
        }
        self.log.lock().expect("log lock").feed_created += 1;
        Ok(Box::new(MockFeed::new(self.feed.clone(), self.log.clone())))
    }
}

#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub sections: Vec<String>,
    pub records: Vec<DisplayRecord>,
    pub notices: Vec<String>,
}

impl CollectingReporter {
    pub fn live_updates(&self) -> Vec<&DisplayRecord> {
        self.records
            .iter()
            .filter(|record| matches!(record, DisplayRecord::LiveUpdate { .. }))
            .collect()
    }
}

impl Reporter for CollectingReporter {
    fn section(&mut self, title: &str) {
        self.sections.push(title.to_string());
    }

    fn record(&mut self, record: &DisplayRecord) {
        self.records.push(record.clone());
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

pub fn market(symbol: &str, kind: InstrumentKind) -> MarketInfo {
    MarketInfo {
        symbol: symbol.to_string(),
        base: "XBT".into(),
        quote: "USDT".into(),
        kind: Some(kind),
        active: true,
    }
}

pub fn book_update(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> BookUpdate {
    BookUpdate {
        symbol: "XBTUSDTM".into(),
        sequence: None,
        bids: bids.iter().map(|(p, s)| level(p, s)).collect(),
        asks: asks.iter().map(|(p, s)| level(p, s)).collect(),
    }
}
