//! Coin transfers executed in a block.

use serde::{Deserialize, Serialize};

use crate::{Address, Coins};

/// One receiver of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub address: Address,
    pub coins: Coins,
}

/// A transfer from one sender to one or more receivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub tx_hash: String,
    pub from: Address,
    pub to: Vec<Receiver>,
}
