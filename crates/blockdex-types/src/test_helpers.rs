//! Deterministic fixtures shared by downstream tests.

use ed25519_dalek::SigningKey;

use crate::{Account, Address, Coin, Coins, PubKey};

/// Deterministic signing key; distinct `n` give distinct keys.
#[must_use]
pub fn signing_key(n: u8) -> SigningKey {
    SigningKey::from_bytes(&[n; 32])
}

/// Address owned by [`signing_key`]`(n)`.
#[must_use]
pub fn address_of(n: u8) -> Address {
    PubKey::from(&signing_key(n).verifying_key()).address()
}

/// Fresh account for key `n` holding `coins` (denom, amount) as free balance.
#[must_use]
pub fn funded_account(n: u8, account_number: u64, coins: &[(&str, i64)]) -> Account {
    let mut account = Account::new(address_of(n), account_number);
    account.coins = Coins::from_coins(coins.iter().map(|(d, a)| Coin::new(*d, *a)))
        .unwrap_or_default();
    account
}
