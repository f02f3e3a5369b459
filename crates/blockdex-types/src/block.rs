//! Everything a block produced that market-data consumers care about.

use serde::{Deserialize, Serialize};

use crate::{AccountBalanceEvent, BlockFeeRecord, OrderChange, Proposal, Trade, Transfer};

/// Events collected over one block, handed to publication after
/// the block ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOutput {
    pub height: i64,
    /// Block time, milliseconds since the UNIX epoch.
    pub timestamp: i64,
    pub fee: BlockFeeRecord,
    pub orders: Vec<OrderChange>,
    pub trades: Vec<Trade>,
    pub proposals: Vec<Proposal>,
    pub transfers: Vec<Transfer>,
    pub accounts: Vec<AccountBalanceEvent>,
}
