//! Order model: sides, types, lifecycle statuses and the order-change event.
//!
//! Prices and quantities are fixed-point `i64` with 8 decimal places
//! (see [`crate::constants::FIXED_POINT_SCALE`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Address;

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire code (`1` buy, `2` sell).
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Buy => 1,
            Self::Sell => 2,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The type of order. Only limit orders are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
}

impl OrderType {
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Limit => 2,
        }
    }
}

/// How long an order rests on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till expire.
    Gte,
    /// Immediate or cancel.
    Ioc,
}

impl TimeInForce {
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Gte => 1,
            Self::Ioc => 3,
        }
    }
}

/// Lifecycle status carried by an order-change event.
///
/// The first six are the publishable statuses. The matching engine also
/// reports `FailedBlocking` / `FailedMatching`; those never reach consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Ack,
    PartialFill,
    FullyFill,
    Expired,
    IocNoFill,
    Canceled,
    FailedBlocking,
    FailedMatching,
}

impl OrderStatus {
    #[must_use]
    pub fn is_publishable(self) -> bool {
        !matches!(self, Self::FailedBlocking | Self::FailedMatching)
    }

    /// Name used in published records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ack => "Ack",
            Self::PartialFill => "PartialFill",
            Self::FullyFill => "FullyFill",
            Self::Expired => "Expired",
            Self::IocNoFill => "IocNoFill",
            Self::Canceled => "Canceled",
            Self::FailedBlocking => "FailedBlocking",
            Self::FailedMatching => "FailedMatching",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status transition of an order, as reported to market-data consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChange {
    pub order_id: String,
    pub symbol: String,
    pub owner: Address,
    pub side: Side,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub price: i64,
    /// Original order quantity.
    pub qty: i64,
    pub status: OrderStatus,
    pub last_executed_price: i64,
    pub last_executed_qty: i64,
    /// Cumulative filled quantity after this change.
    pub cum_qty: i64,
    /// Fee charged on this change, `DENOM:AMOUNT;...`.
    pub fee: String,
    pub trade_id: String,
    pub order_creation_time: i64,
    pub transaction_time: i64,
    pub tx_hash: String,
}

impl OrderChange {
    /// Quantity still resting on the book after this change.
    #[must_use]
    pub fn remaining_qty(&self) -> i64 {
        self.qty - self.cum_qty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_statuses_are_not_publishable() {
        assert!(OrderStatus::Ack.is_publishable());
        assert!(OrderStatus::IocNoFill.is_publishable());
        assert!(!OrderStatus::FailedBlocking.is_publishable());
        assert!(!OrderStatus::FailedMatching.is_publishable());
    }

    #[test]
    fn wire_codes() {
        assert_eq!(Side::Buy.code(), 1);
        assert_eq!(Side::Sell.code(), 2);
        assert_eq!(OrderType::Limit.code(), 2);
        assert_eq!(TimeInForce::Ioc.code(), 3);
        assert_eq!(OrderStatus::PartialFill.to_string(), "PartialFill");
    }
}
