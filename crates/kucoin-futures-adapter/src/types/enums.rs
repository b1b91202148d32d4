/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Done,
    #[serde(other)]
    Unknown,
}

/// Contract family as reported by the contracts endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractType {
    /// Perpetual swap
    #[serde(rename = "FFWCSX")]
    Perpetual,
    /// Dated futures contract
    #[serde(rename = "FFICSX")]
    Delivery,
    #[serde(other)]
    Unknown,
}

/// Instrument kind used when filtering the market catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Spot,
    Swap,
    Future,
}

impl ContractType {
    pub fn kind(self) -> Option<InstrumentKind> {
        match self {
            ContractType::Perpetual => Some(InstrumentKind::Swap),
            ContractType::Delivery => Some(InstrumentKind::Future),
            ContractType::Unknown => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        })
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Other => "other",
        })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderStatus::Open => "open",
            OrderStatus::Done => "done",
            OrderStatus::Unknown => "unknown",
        })
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstrumentKind::Spot => "spot",
            InstrumentKind::Swap => "swap",
            InstrumentKind::Future => "future",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_type_kind() {
        let perpetual: ContractType = serde_json::from_str(r#""FFWCSX""#).unwrap();
        let delivery: ContractType = serde_json::from_str(r#""FFICSX""#).unwrap();
        let unknown: ContractType = serde_json::from_str(r#""XXXXXX""#).unwrap();

        assert_eq!(perpetual.kind(), Some(InstrumentKind::Swap));
        assert_eq!(delivery.kind(), Some(InstrumentKind::Future));
        assert_eq!(unknown.kind(), None);
    }

    #[test]
    fn test_order_status_tolerates_unknown() {
        let status: OrderStatus = serde_json::from_str(r#""pending""#).unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }
}
