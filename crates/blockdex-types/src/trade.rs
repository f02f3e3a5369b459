//! Trades reported by the matching engine.

use serde::{Deserialize, Serialize};

use crate::Address;

/// A fill between a sell order and a buy order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub price: i64,
    pub qty: i64,
    /// Sell order id.
    pub sid: String,
    /// Buy order id.
    pub bid: String,
    pub seller: Address,
    pub buyer: Address,
    /// Seller fee, `DENOM:AMOUNT;...`.
    pub seller_fee: String,
    /// Buyer fee, `DENOM:AMOUNT;...`.
    pub buyer_fee: String,
}

/// Outcome of a governance proposal reported alongside execution results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: i64,
    pub status: ProposalStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Succeeded,
    Failed,
}

impl ProposalStatus {
    /// Single-letter wire form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "S",
            Self::Failed => "F",
        }
    }
}
