/*
[INPUT]:  Gateway and feed views produced by session steps
[OUTPUT]: Display records and human-readable console output
[POS]:    Presentation layer - formatting and rendering (no exchange access)
[UPDATE]: When adding a data category or changing number formatting
*/

use chrono::{DateTime, Local, Utc};
use console::{Term, style};
use kucoin_futures_adapter::Side;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::gateway::{BookLevel, PositionSide};

const PRICE_DP: u32 = 2;
const SIZE_DP: u32 = 4;
const MISSING: &str = "N/A";
const SEPARATOR: &str = "----------------------------------------";

/// Price at 2 decimals, midpoint rounded away from zero (100.005 -> "100.01")
pub fn format_price(value: Decimal) -> String {
    fixed(value, PRICE_DP)
}

/// Size at 4 decimals, zero padded (2 -> "2.0000")
pub fn format_size(value: Decimal) -> String {
    fixed(value, SIZE_DP)
}

pub fn format_spread(value: Decimal) -> String {
    fixed(value, PRICE_DP)
}

pub fn format_opt_price(value: Option<Decimal>) -> String {
    value.map(format_price).unwrap_or_else(|| MISSING.to_string())
}

fn format_opt_pct(value: Option<Decimal>) -> String {
    value
        .map(|pct| format!("{}%", fixed(pct, PRICE_DP)))
        .unwrap_or_else(|| MISSING.to_string())
}

fn format_opt_amount(value: Option<Decimal>) -> String {
    value
        .map(|v| v.normalize().to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

fn fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded.to_string()
}

/// Best ask minus best bid, only when both sides have a level
pub fn spread(bids: &[BookLevel], asks: &[BookLevel]) -> Option<Decimal> {
    match (bids.first(), asks.first()) {
        (Some(bid), Some(ask)) => Some(ask.price - bid.price),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLevel {
    pub price: String,
    pub size: String,
}

impl From<&BookLevel> for FormattedLevel {
    fn from(level: &BookLevel) -> Self {
        Self {
            price: format_price(level.price),
            size: format_size(level.size),
        }
    }
}

/// First `limit` levels of one book side, formatted
pub fn formatted_levels(levels: &[BookLevel], limit: usize) -> Vec<FormattedLevel> {
    levels.iter().take(limit).map(FormattedLevel::from).collect()
}

/// One printable row, grouped by data category
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayRecord {
    Balance {
        currency: String,
        total: Decimal,
        free: Decimal,
    },
    Ticker {
        symbol: String,
        last: Option<Decimal>,
        high_24h: Option<Decimal>,
        low_24h: Option<Decimal>,
        volume_24h: Option<Decimal>,
        change_pct_24h: Option<Decimal>,
    },
    OrderBook {
        symbol: String,
        bids: Vec<FormattedLevel>,
        asks: Vec<FormattedLevel>,
    },
    OpenOrder {
        id: String,
        order_type: String,
        side: Side,
        price: Option<Decimal>,
        amount: Decimal,
        status: String,
    },
    Fill {
        id: String,
        side: Side,
        price: Decimal,
        amount: Decimal,
        cost: Option<Decimal>,
        timestamp: Option<DateTime<Utc>>,
    },
    Position {
        symbol: String,
        side: PositionSide,
        size: Decimal,
        entry_price: Option<Decimal>,
        mark_price: Option<Decimal>,
        unrealized_pnl: Option<Decimal>,
        pnl_pct: Option<Decimal>,
    },
    Market {
        symbol: String,
        base: String,
        quote: String,
        active: bool,
    },
    LiveUpdate {
        sequence: u64,
        timestamp: DateTime<Local>,
        top_bids: Vec<FormattedLevel>,
        top_asks: Vec<FormattedLevel>,
        spread: Option<String>,
    },
}

/// Sink for session output
pub trait Reporter: Send {
    fn section(&mut self, title: &str);

    fn record(&mut self, record: &DisplayRecord);

    /// Informational line, e.g. "no open orders"
    fn notice(&mut self, message: &str);
}

/// Renders records to stdout with colour
#[derive(Debug)]
pub struct ConsoleReporter {
    term: Term,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    fn line(&self, text: impl AsRef<str>) {
        if let Err(err) = self.term.write_line(text.as_ref()) {
            debug!(error = %err, "console write failed");
        }
    }

    fn levels(&self, label: &str, levels: &[FormattedLevel], bid: bool) {
        self.line(format!("  {label}:"));
        if levels.is_empty() {
            self.line(format!("    {}", style("(empty)").dim()));
        }
        for level in levels {
            let text = format!("    {} @ {}", level.size, level.price);
            if bid {
                self.line(format!("{}", style(text).green()));
            } else {
                self.line(format!("{}", style(text).red()));
            }
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn section(&mut self, title: &str) {
        self.line("");
        self.line(format!("{}", style(format!("=== {title} ===")).bold().cyan()));
    }

    fn record(&mut self, record: &DisplayRecord) {
        match record {
            DisplayRecord::Balance { currency, total, free } => {
                self.line(format!(
                    "  {}: total={} free={}",
                    style(currency).bold(),
                    total.normalize(),
                    free.normalize()
                ));
            }
            DisplayRecord::Ticker {
                symbol,
                last,
                high_24h,
                low_24h,
                volume_24h,
                change_pct_24h,
            } => {
                self.line(format!("  {}", style(symbol).bold()));
                self.line(format!("    last:       {}", format_opt_price(*last)));
                self.line(format!("    24h high:   {}", format_opt_price(*high_24h)));
                self.line(format!("    24h low:    {}", format_opt_price(*low_24h)));
                self.line(format!("    24h volume: {}", format_opt_amount(*volume_24h)));
                self.line(format!("    24h change: {}", format_opt_pct(*change_pct_24h)));
            }
            DisplayRecord::OrderBook { symbol, bids, asks } => {
                self.line(format!("  order book {symbol}"));
                self.levels("bids", bids, true);
                self.levels("asks", asks, false);
            }
            DisplayRecord::OpenOrder {
                id,
                order_type,
                side,
                price,
                amount,
                status,
            } => {
                self.line(format!(
                    "  order {id}: {order_type} {side} {} @ {} [{status}]",
                    amount.normalize(),
                    format_opt_price(*price)
                ));
            }
            DisplayRecord::Fill {
                id,
                side,
                price,
                amount,
                cost,
                timestamp,
            } => {
                let when = timestamp
                    .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| MISSING.to_string());
                self.line(format!(
                    "  fill {id}: {side} {} @ {} cost={} at {when}",
                    amount.normalize(),
                    format_price(*price),
                    format_opt_amount(*cost)
                ));
            }
            DisplayRecord::Position {
                symbol,
                side,
                size,
                entry_price,
                mark_price,
                unrealized_pnl,
                pnl_pct,
            } => {
                let side_text = match side {
                    PositionSide::Long => style(side.to_string()).green(),
                    PositionSide::Short => style(side.to_string()).red(),
                };
                self.line(format!("  {} {side_text} {}", style(symbol).bold(), size.normalize()));
                self.line(format!("    entry: {}", format_opt_price(*entry_price)));
                self.line(format!("    mark:  {}", format_opt_price(*mark_price)));
                self.line(format!(
                    "    upnl:  {} ({})",
                    format_opt_amount(*unrealized_pnl),
                    format_opt_pct(*pnl_pct)
                ));
            }
            DisplayRecord::Market {
                symbol,
                base,
                quote,
                active,
            } => {
                let state = if *active { "active" } else { "inactive" };
                self.line(format!("  {symbol}: {base}/{quote} {state}"));
            }
            DisplayRecord::LiveUpdate {
                sequence,
                timestamp,
                top_bids,
                top_asks,
                spread,
            } => {
                self.line(format!(
                    "{} {}",
                    style(format!("update #{sequence}")).bold(),
                    timestamp.format("%H:%M:%S%.3f")
                ));
                self.levels("bids", top_bids, true);
                self.levels("asks", top_asks, false);
                if let Some(spread) = spread {
                    self.line(format!("  spread: {spread}"));
                }
                self.line(SEPARATOR);
            }
        }
    }

    fn notice(&mut self, message: &str) {
        self.line(format!("  {}", style(message).dim()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn level(price: &str, size: &str) -> BookLevel {
        BookLevel {
            price: dec(price),
            size: dec(size),
        }
    }

    #[rstest]
    #[case("100.005", "100.01")]
    #[case("99.5", "99.50")]
    #[case("-0.005", "-0.01")]
    #[case("64250.1", "64250.10")]
    #[case("0", "0.00")]
    fn test_format_price(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(format_price(dec(input)), expected);
    }

    #[rstest]
    #[case("1.2345", "1.2345")]
    #[case("2", "2.0000")]
    #[case("0.00005", "0.0001")]
    fn test_format_size(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(format_size(dec(input)), expected);
    }

    #[test]
    fn test_formatted_levels_caps_per_side() {
        let levels: Vec<_> = (0..8).map(|i| level(&format!("{}", 100 - i), "1")).collect();
        let formatted = formatted_levels(&levels, 5);
        assert_eq!(formatted.len(), 5);
        assert_eq!(formatted[0], FormattedLevel { price: "100.00".into(), size: "1.0000".into() });
    }

    #[test]
    fn test_spread_requires_both_sides() {
        let bids = [level("100.00", "1")];
        let asks = [level("100.50", "1")];
        assert_eq!(spread(&bids, &asks).map(format_spread), Some("0.50".to_string()));
        assert_eq!(spread(&[], &asks), None);
        assert_eq!(spread(&bids, &[]), None);
    }

    #[test]
    fn test_missing_values_render_na() {
        assert_eq!(format_opt_price(None), "N/A");
        assert_eq!(format_opt_pct(Some(dec("1.234"))), "1.23%");
    }
}
