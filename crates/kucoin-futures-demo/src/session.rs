/*
[INPUT]:  Demo configuration, client factory, reporter, shutdown token
[OUTPUT]: Ordered fetch/display pipeline, live watch, guaranteed cleanup, run report
[POS]:    Control layer - session lifecycle
[UPDATE]: When adding pipeline steps or changing failure policy
*/

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Local;
use futures_util::FutureExt;
use kucoin_futures_adapter::{InstrumentKind, KucoinError};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, DemoConfig};
use crate::display::{DisplayRecord, Reporter, format_spread, formatted_levels, spread};
use crate::gateway::{ClientFactory, MarketGateway, OrderBookFeed};

/// Open orders and fills shown per symbol
pub const TRADING_ROWS: usize = 5;
/// Futures shown from the catalog
pub const CATALOG_ROWS: usize = 10;
/// Levels per side shown for each live update
pub const LIVE_LEVELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Failure ends the pipeline
    Fatal,
    /// Failure is logged and the pipeline moves on
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Initialize,
    AccountSummary,
    MarketSnapshot,
    TradingSnapshot,
    PositionsSnapshot,
    SymbolCatalog,
    WatchLive,
}

impl Step {
    /// Execution order of a session
    pub const PIPELINE: [Step; 7] = [
        Step::Initialize,
        Step::AccountSummary,
        Step::MarketSnapshot,
        Step::TradingSnapshot,
        Step::PositionsSnapshot,
        Step::SymbolCatalog,
        Step::WatchLive,
    ];

    pub fn policy(self) -> StepPolicy {
        match self {
            Step::Initialize => StepPolicy::Fatal,
            _ => StepPolicy::BestEffort,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::Initialize => "initialize",
            Step::AccountSummary => "account_summary",
            Step::MarketSnapshot => "market_snapshot",
            Step::TradingSnapshot => "trading_snapshot",
            Step::PositionsSnapshot => "positions_snapshot",
            Step::SymbolCatalog => "symbol_catalog",
            Step::WatchLive => "watch_live",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("failed to construct {client} client: {source}")]
    ClientInit {
        client: &'static str,
        #[source]
        source: KucoinError,
    },

    #[error("{step} failed: {source}")]
    Fetch {
        step: Step,
        #[source]
        source: KucoinError,
    },

    #[error("order book stream failed: {0}")]
    Stream(#[source] KucoinError),

    #[error("session is not initialized")]
    NotInitialized,

    #[error("pipeline panicked: {0}")]
    Panicked(String),
}

/// Successful step result. Empty data is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Reported { records: usize },
    Empty,
}

impl StepOutcome {
    fn from_count(records: usize) -> Self {
        if records == 0 {
            StepOutcome::Empty
        } else {
            StepOutcome::Reported { records }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Completed(StepOutcome),
    Failed(String),
    Skipped,
}

/// How the live watch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    TimedOut { updates: u64 },
    Interrupted { updates: u64 },
    StreamFailed { updates: u64, reason: String },
}

impl WatchOutcome {
    pub fn updates(&self) -> u64 {
        match self {
            WatchOutcome::TimedOut { updates }
            | WatchOutcome::Interrupted { updates }
            | WatchOutcome::StreamFailed { updates, .. } => *updates,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub feed_closed: bool,
    pub gateway_closed: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SessionReport {
    pub steps: Vec<(Step, StepStatus)>,
    pub watch: Option<WatchOutcome>,
    pub cleanup: CleanupReport,
    /// Error that ended the pipeline early
    pub fatal: Option<SessionError>,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.fatal.is_none()
    }

    pub fn status(&self, step: Step) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|(candidate, _)| *candidate == step)
            .map(|(_, status)| status)
    }
}

/// Owns both exchange collaborators for one run and drives the pipeline
pub struct Session<F, R> {
    config: DemoConfig,
    factory: F,
    reporter: R,
    shutdown: CancellationToken,
    gateway: Option<Box<dyn MarketGateway>>,
    feed: Option<Box<dyn OrderBookFeed>>,
}

impl<F, R> Session<F, R>
where
    F: ClientFactory,
    R: Reporter,
{
    pub fn new(config: DemoConfig, factory: F, reporter: R, shutdown: CancellationToken) -> Self {
        Self {
            config,
            factory,
            reporter,
            shutdown,
            gateway: None,
            feed: None,
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn is_active(&self) -> bool {
        self.gateway.is_some() && self.feed.is_some()
    }

    /// Run every step in order, then clean up. Never panics.
    pub async fn run(&mut self) -> SessionReport {
        let mut report = SessionReport::default();

        let pipeline = AssertUnwindSafe(self.run_pipeline(&mut report))
            .catch_unwind()
            .await;

        match pipeline {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(error = %err, "session aborted");
                report.fatal = Some(err);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "session step panicked");
                report.fatal = Some(SessionError::Panicked(message));
            }
        }

        report.cleanup = self.cleanup().await;
        info!(
            steps = report.steps.len(),
            success = report.is_success(),
            "session finished"
        );
        report
    }

    async fn run_pipeline(&mut self, report: &mut SessionReport) -> Result<(), SessionError> {
        for (index, step) in Step::PIPELINE.into_iter().enumerate() {
            if step != Step::Initialize && self.shutdown.is_cancelled() {
                info!(step = %step, "interrupt received, skipping remaining steps");
                for skipped in &Step::PIPELINE[index..] {
                    report.steps.push((*skipped, StepStatus::Skipped));
                }
                report.watch = Some(WatchOutcome::Interrupted { updates: 0 });
                return Ok(());
            }

            match self.execute(step, report).await {
                Ok(outcome) => {
                    debug!(step = %step, outcome = ?outcome, "step completed");
                    report.steps.push((step, StepStatus::Completed(outcome)));
                }
                Err(err) => match step.policy() {
                    StepPolicy::Fatal => {
                        report.steps.push((step, StepStatus::Failed(err.to_string())));
                        for skipped in &Step::PIPELINE[index + 1..] {
                            report.steps.push((*skipped, StepStatus::Skipped));
                        }
                        return Err(err);
                    }
                    StepPolicy::BestEffort => {
                        warn!(step = %step, error = %err, "step failed, continuing");
                        report.steps.push((step, StepStatus::Failed(err.to_string())));
                    }
                },
            }
        }
        Ok(())
    }

    async fn execute(
        &mut self,
        step: Step,
        report: &mut SessionReport,
    ) -> Result<StepOutcome, SessionError> {
        let symbol = self.config.symbol.clone();
        match step {
            Step::Initialize => self.initialize().await.map(|()| StepOutcome::Empty),
            Step::AccountSummary => self.fetch_account_summary().await,
            Step::MarketSnapshot => self.fetch_market_snapshot(&symbol).await,
            Step::TradingSnapshot => self.fetch_trading_snapshot(&symbol).await,
            Step::PositionsSnapshot => self.fetch_positions_snapshot(&symbol).await,
            Step::SymbolCatalog => self.fetch_symbol_catalog().await,
            Step::WatchLive => {
                let outcome = self.watch_live(&symbol, self.config.watch_duration()).await;
                let updates = usize::try_from(outcome.updates()).unwrap_or(usize::MAX);
                report.watch = Some(outcome);
                Ok(StepOutcome::from_count(updates))
            }
        }
    }

    /// Validate credentials, then build the request-style and streaming-style clients.
    ///
    /// A client built before a later construction failure is released here.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        let credentials = self.config.credentials()?;
        info!(symbol = %self.config.symbol, "initializing exchange clients");

        let gateway = self
            .factory
            .create_gateway(&self.config, &credentials)
            .await
            .map_err(|source| SessionError::ClientInit {
                client: "request",
                source,
            })?;
        self.gateway = Some(gateway);

        let feed = self
            .factory
            .create_feed(&self.config)
            .await
            .map_err(|source| SessionError::ClientInit {
                client: "streaming",
                source,
            })?;
        self.feed = Some(feed);

        info!("exchange clients ready");
        Ok(())
    }

    fn gateway(&self) -> Result<&dyn MarketGateway, SessionError> {
        self.gateway.as_deref().ok_or(SessionError::NotInitialized)
    }

    pub async fn fetch_account_summary(&mut self) -> Result<StepOutcome, SessionError> {
        self.reporter.section("Account balance");
        let step = Step::AccountSummary;
        let balances = self
            .gateway()?
            .fetch_balances()
            .await
            .map_err(|source| SessionError::Fetch { step, source })?;

        let mut shown = 0;
        for balance in balances.into_iter().filter(|b| b.total > Decimal::ZERO) {
            self.reporter.record(&DisplayRecord::Balance {
                currency: balance.currency,
                total: balance.total,
                free: balance.free,
            });
            shown += 1;
        }
        if shown == 0 {
            self.reporter.notice("no balances");
        }
        Ok(StepOutcome::from_count(shown))
    }

    pub async fn fetch_market_snapshot(&mut self, symbol: &str) -> Result<StepOutcome, SessionError> {
        self.reporter.section(&format!("Market {symbol}"));
        let step = Step::MarketSnapshot;
        let depth = self.config.depth_limit;
        let gateway = self.gateway()?;

        let ticker = gateway
            .fetch_ticker(symbol)
            .await
            .map_err(|source| SessionError::Fetch { step, source })?;
        let book = gateway
            .fetch_order_book(symbol, depth)
            .await
            .map_err(|source| SessionError::Fetch { step, source })?;

        self.reporter.record(&DisplayRecord::Ticker {
            symbol: ticker.symbol,
            last: ticker.last,
            high_24h: ticker.high,
            low_24h: ticker.low,
            volume_24h: ticker.volume,
            change_pct_24h: ticker.change_pct,
        });

        let bids = formatted_levels(&book.bids, depth);
        let asks = formatted_levels(&book.asks, depth);
        let levels = bids.len() + asks.len();
        self.reporter.record(&DisplayRecord::OrderBook {
            symbol: symbol.to_string(),
            bids,
            asks,
        });
        Ok(StepOutcome::Reported { records: 1 + levels })
    }

    /// Open orders, then recent fills. Either sub-step may fail without hiding the other.
    pub async fn fetch_trading_snapshot(&mut self, symbol: &str) -> Result<StepOutcome, SessionError> {
        let step = Step::TradingSnapshot;
        let mut shown = 0;

        self.reporter.section(&format!("Open orders {symbol}"));
        let orders = self.gateway()?.fetch_open_orders(symbol).await;
        let orders_failed = match orders {
            Ok(orders) if orders.is_empty() => {
                self.reporter.notice("no open orders");
                false
            }
            Ok(orders) => {
                for order in orders.into_iter().take(TRADING_ROWS) {
                    self.reporter.record(&DisplayRecord::OpenOrder {
                        id: order.id,
                        order_type: order.order_type,
                        side: order.side,
                        price: order.price,
                        amount: order.amount,
                        status: order.status,
                    });
                    shown += 1;
                }
                false
            }
            Err(err) => {
                warn!(step = %step, part = "open_orders", error = %err, "fetch failed");
                self.reporter.notice("open orders unavailable");
                true
            }
        };

        self.reporter.section(&format!("Recent fills {symbol}"));
        let fills = self.gateway()?.fetch_recent_fills(symbol, TRADING_ROWS).await;
        match fills {
            Ok(fills) if fills.is_empty() => self.reporter.notice("no recent fills"),
            Ok(fills) => {
                for fill in fills.into_iter().take(TRADING_ROWS) {
                    self.reporter.record(&DisplayRecord::Fill {
                        id: fill.id,
                        side: fill.side,
                        price: fill.price,
                        amount: fill.amount,
                        cost: fill.cost,
                        timestamp: fill.timestamp,
                    });
                    shown += 1;
                }
            }
            Err(source) if orders_failed => return Err(SessionError::Fetch { step, source }),
            Err(err) => {
                warn!(step = %step, part = "fills", error = %err, "fetch failed");
                self.reporter.notice("recent fills unavailable");
            }
        }

        Ok(StepOutcome::from_count(shown))
    }

    pub async fn fetch_positions_snapshot(&mut self, symbol: &str) -> Result<StepOutcome, SessionError> {
        self.reporter.section(&format!("Positions {symbol}"));
        let step = Step::PositionsSnapshot;
        let positions = self
            .gateway()?
            .fetch_positions(&[symbol.to_string()])
            .await
            .map_err(|source| SessionError::Fetch { step, source })?;

        let mut shown = 0;
        for position in positions.into_iter().filter(|p| p.symbol == symbol) {
            let Some(side) = position.side() else {
                continue;
            };
            self.reporter.record(&DisplayRecord::Position {
                side,
                size: position.contracts.abs(),
                symbol: position.symbol,
                entry_price: position.entry_price,
                mark_price: position.mark_price,
                unrealized_pnl: position.unrealized_pnl,
                pnl_pct: position.pnl_pct,
            });
            shown += 1;
        }
        if shown == 0 {
            self.reporter.notice("no open positions");
        }
        Ok(StepOutcome::from_count(shown))
    }

    pub async fn fetch_symbol_catalog(&mut self) -> Result<StepOutcome, SessionError> {
        self.reporter.section("Futures contracts");
        let step = Step::SymbolCatalog;
        let markets = self
            .gateway()?
            .fetch_markets()
            .await
            .map_err(|source| SessionError::Fetch { step, source })?;

        let mut shown = 0;
        for market in markets
            .into_iter()
            .filter(|m| m.kind == Some(InstrumentKind::Future))
            .take(CATALOG_ROWS)
        {
            self.reporter.record(&DisplayRecord::Market {
                symbol: market.symbol,
                base: market.base,
                quote: market.quote,
                active: market.active,
            });
            shown += 1;
        }
        if shown == 0 {
            self.reporter.notice("no futures contracts");
        }
        Ok(StepOutcome::from_count(shown))
    }

    /// Print order book updates until the deadline, an interrupt, or a stream error.
    ///
    /// The deadline starts before the subscription request. Never returns an error.
    pub async fn watch_live(&mut self, symbol: &str, duration: Duration) -> WatchOutcome {
        self.reporter
            .section(&format!("Live order book {symbol} ({}s)", duration.as_secs()));

        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);

        let Some(feed) = self.feed.as_deref_mut() else {
            let reason = SessionError::NotInitialized.to_string();
            warn!(error = %reason, "live watch unavailable");
            return WatchOutcome::StreamFailed { updates: 0, reason };
        };

        let subscribed = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            _ = &mut deadline => None,
            result = feed.subscribe(symbol) => Some(result),
        };
        if let Some(Err(err)) = subscribed {
            let err = SessionError::Stream(err);
            warn!(symbol, error = %err, updates = 0, "live watch stopped by stream error");
            return WatchOutcome::StreamFailed {
                updates: 0,
                reason: err.to_string(),
            };
        }

        let mut updates: u64 = 0;
        let outcome = if subscribed.is_none() {
            None
        } else {
            loop {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => break None,
                    _ = &mut deadline => break None,
                    next = feed.next_update() => match next {
                        Ok(update) => {
                            updates += 1;
                            let spread = spread(&update.bids, &update.asks).map(format_spread);
                            self.reporter.record(&DisplayRecord::LiveUpdate {
                                sequence: updates,
                                timestamp: Local::now(),
                                top_bids: formatted_levels(&update.bids, LIVE_LEVELS),
                                top_asks: formatted_levels(&update.asks, LIVE_LEVELS),
                                spread,
                            });
                        }
                        Err(err) => break Some(SessionError::Stream(err)),
                    },
                }
            }
        };

        if let Some(err) = outcome {
            warn!(symbol, error = %err, updates, "live watch stopped by stream error");
            return WatchOutcome::StreamFailed {
                updates,
                reason: err.to_string(),
            };
        }

        let outcome = if self.shutdown.is_cancelled() {
            info!(symbol, updates, "live watch interrupted");
            WatchOutcome::Interrupted { updates }
        } else {
            info!(symbol, updates, "live watch cutoff reached");
            WatchOutcome::TimedOut { updates }
        };

        if subscribed.is_some() {
            if let Err(err) = feed.unsubscribe(symbol).await {
                debug!(symbol, error = %err, "unsubscribe failed");
            }
        }
        outcome
    }

    /// Release both clients. Each close is independent; repeated calls are no-ops.
    pub async fn cleanup(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        if let Some(mut feed) = self.feed.take() {
            match feed.close().await {
                Ok(()) => report.feed_closed = true,
                Err(err) => {
                    warn!(client = "streaming", error = %err, "close failed");
                    report.errors.push(format!("streaming: {err}"));
                }
            }
        }

        if let Some(mut gateway) = self.gateway.take() {
            match gateway.close().await {
                Ok(()) => report.gateway_closed = true,
                Err(err) => {
                    warn!(client = "request", error = %err, "close failed");
                    report.errors.push(format!("request: {err}"));
                }
            }
        }

        if report.feed_closed || report.gateway_closed || !report.errors.is_empty() {
            info!(
                feed_closed = report.feed_closed,
                gateway_closed = report.gateway_closed,
                "cleanup complete"
            );
        }
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_order_and_policy() {
        assert_eq!(Step::PIPELINE[0], Step::Initialize);
        assert_eq!(Step::PIPELINE[6], Step::WatchLive);
        assert_eq!(Step::Initialize.policy(), StepPolicy::Fatal);
        assert!(
            Step::PIPELINE[1..]
                .iter()
                .all(|step| step.policy() == StepPolicy::BestEffort)
        );
    }

    #[test]
    fn test_step_outcome_from_count() {
        assert_eq!(StepOutcome::from_count(0), StepOutcome::Empty);
        assert_eq!(StepOutcome::from_count(3), StepOutcome::Reported { records: 3 });
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
    }

    #[test]
    fn test_fetch_error_names_step() {
        let err = SessionError::Fetch {
            step: Step::AccountSummary,
            source: KucoinError::Closed,
        };
        assert_eq!(err.to_string(), "account_summary failed: Client is closed");
    }
}
