//! Fee model: how much a message costs and who receives it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, Coins};

/// Distribution rule for a charged fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeMode {
    /// Nothing is charged.
    Free,
    /// Paid by the sender; goes to the block proposer.
    SenderPays,
    /// Paid by the sender; split across the whole validator set.
    SharedByValidators,
}

impl FeeMode {
    /// Mode of a block fee after merging `other` into it.
    /// `SharedByValidators` dominates.
    #[must_use]
    pub fn merged_with(self, other: FeeMode) -> FeeMode {
        match (self, other) {
            (FeeMode::SharedByValidators, _) | (_, FeeMode::SharedByValidators) => {
                FeeMode::SharedByValidators
            }
            (FeeMode::SenderPays, _) | (_, FeeMode::SenderPays) => FeeMode::SenderPays,
            _ => FeeMode::Free,
        }
    }
}

impl fmt::Display for FeeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "FREE"),
            Self::SenderPays => write!(f, "SENDER_PAYS"),
            Self::SharedByValidators => write!(f, "SHARED_BY_VALIDATORS"),
        }
    }
}

/// Fee computed for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub tokens: Coins,
    pub mode: FeeMode,
}

impl Fee {
    #[must_use]
    pub fn new(tokens: Coins, mode: FeeMode) -> Self {
        Self { tokens, mode }
    }

    #[must_use]
    pub fn free() -> Self {
        Self::new(Coins::new(), FeeMode::Free)
    }

    /// Free-mode and zero-token fees skip all funds checks.
    #[must_use]
    pub fn is_chargeable(&self) -> bool {
        self.mode != FeeMode::Free && !self.tokens.is_zero()
    }
}

/// Fees collected over one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFeeRecord {
    pub height: i64,
    pub fee: Coins,
    /// Addresses sharing the fee, in validator-set order.
    pub validators: Vec<Address>,
}
