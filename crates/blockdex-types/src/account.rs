//! On-chain account state and the per-block balance snapshot published for it.

use serde::{Deserialize, Serialize};

use crate::{Address, Coins, PubKey};

/// Persisted state of one account.
///
/// `coins` is the free balance. `frozen_coins` are held by governance or
/// compliance actions; `locked_coins` back open orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    /// Assigned once at creation, never reused.
    pub account_number: u64,
    /// Count of transactions this account has signed.
    pub sequence: u64,
    pub coins: Coins,
    pub frozen_coins: Coins,
    pub locked_coins: Coins,
    /// Bound by the first transaction the account signs.
    pub pub_key: Option<PubKey>,
}

impl Account {
    #[must_use]
    pub fn new(address: Address, account_number: u64) -> Self {
        Self {
            address,
            account_number,
            sequence: 0,
            coins: Coins::new(),
            frozen_coins: Coins::new(),
            locked_coins: Coins::new(),
            pub_key: None,
        }
    }

    /// Per-asset view over free/frozen/locked, sorted by asset.
    #[must_use]
    pub fn asset_balances(&self) -> Vec<AssetBalance> {
        let mut assets: Vec<&str> = self
            .coins
            .denoms()
            .chain(self.frozen_coins.denoms())
            .chain(self.locked_coins.denoms())
            .collect();
        assets.sort_unstable();
        assets.dedup();
        assets
            .into_iter()
            .map(|asset| AssetBalance {
                asset: asset.to_string(),
                free: self.coins.amount_of(asset),
                frozen: self.frozen_coins.amount_of(asset),
                locked: self.locked_coins.amount_of(asset),
            })
            .collect()
    }
}

/// One asset's balance split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub free: i64,
    pub frozen: i64,
    pub locked: i64,
}

/// Balance snapshot of an account touched during a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalanceEvent {
    pub owner: Address,
    /// Fees this account paid in the block, rendered as `DENOM:AMOUNT;...`.
    pub fee: String,
    pub balances: Vec<AssetBalance>,
}

impl AccountBalanceEvent {
    #[must_use]
    pub fn snapshot(account: &Account, fee_paid: &Coins) -> Self {
        Self {
            owner: account.address,
            fee: fee_paid.to_string(),
            balances: account.asset_balances(),
        }
    }
}
