//! Multi-denomination coin amounts.
//!
//! Amounts are signed 64-bit fixed-point integers (8 decimal places); no
//! floating point anywhere. [`Coins`] is kept normalized: sorted by denom,
//! at most one entry per denom, no zero entries. Arithmetic is checked and
//! returns `None` on overflow.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One denomination and its amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: i64,
}

impl Coin {
    #[must_use]
    pub fn new(denom: impl Into<String>, amount: i64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.denom, self.amount)
    }
}

/// Normalized set of coins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from arbitrary coins, merging duplicates and dropping zeros.
    /// Returns `None` if merging duplicates overflows.
    #[must_use]
    pub fn from_coins(coins: impl IntoIterator<Item = Coin>) -> Option<Self> {
        let mut merged: BTreeMap<String, i64> = BTreeMap::new();
        for coin in coins {
            let slot = merged.entry(coin.denom).or_insert(0);
            *slot = slot.checked_add(coin.amount)?;
        }
        Some(Self::from_map(merged))
    }

    /// Single-denomination shorthand.
    #[must_use]
    pub fn of(denom: &str, amount: i64) -> Self {
        Self::from_map(BTreeMap::from([(denom.to_string(), amount)]))
    }

    fn from_map(map: BTreeMap<String, i64>) -> Self {
        Self(
            map.into_iter()
                .filter(|(_, amount)| *amount != 0)
                .map(|(denom, amount)| Coin { denom, amount })
                .collect(),
        )
    }

    fn to_map(&self) -> BTreeMap<String, i64> {
        self.0
            .iter()
            .map(|c| (c.denom.clone(), c.amount))
            .collect()
    }

    /// Sum of two coin sets.
    #[must_use]
    pub fn checked_plus(&self, other: &Coins) -> Option<Coins> {
        let mut map = self.to_map();
        for coin in &other.0 {
            let slot = map.entry(coin.denom.clone()).or_insert(0);
            *slot = slot.checked_add(coin.amount)?;
        }
        Some(Self::from_map(map))
    }

    /// Difference of two coin sets. The result may hold negative entries;
    /// callers check [`Coins::is_not_negative`] before committing it.
    #[must_use]
    pub fn checked_minus(&self, other: &Coins) -> Option<Coins> {
        let mut map = self.to_map();
        for coin in &other.0 {
            let slot = map.entry(coin.denom.clone()).or_insert(0);
            *slot = slot.checked_sub(coin.amount)?;
        }
        Some(Self::from_map(map))
    }

    #[must_use]
    pub fn is_not_negative(&self) -> bool {
        self.0.iter().all(|c| c.amount >= 0)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn amount_of(&self, denom: &str) -> i64 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map_or(0, |c| c.amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.denom.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{coin}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_sorts_merges_and_drops_zero() {
        let coins = Coins::from_coins([
            Coin::new("XYZ", 5),
            Coin::new("BNB", 3),
            Coin::new("XYZ", -5),
            Coin::new("BNB", 4),
        ])
        .unwrap();
        assert_eq!(coins, Coins::of("BNB", 7));
    }

    #[test]
    fn plus_and_minus() {
        let a = Coins::from_coins([Coin::new("BNB", 10), Coin::new("BTC", 2)]).unwrap();
        let b = Coins::of("BNB", 4);
        let sum = a.checked_plus(&b).unwrap();
        assert_eq!(sum.amount_of("BNB"), 14);
        assert_eq!(sum.amount_of("BTC"), 2);

        let diff = b.checked_minus(&a).unwrap();
        assert_eq!(diff.amount_of("BNB"), -6);
        assert_eq!(diff.amount_of("BTC"), -2);
        assert!(!diff.is_not_negative());
    }

    #[test]
    fn overflow_is_detected() {
        let a = Coins::of("BNB", i64::MAX);
        assert!(a.checked_plus(&Coins::of("BNB", 1)).is_none());
        assert!(Coins::of("BNB", i64::MIN).checked_minus(&Coins::of("BNB", 1)).is_none());
    }

    #[test]
    fn display_joins_with_semicolons() {
        let coins = Coins::from_coins([Coin::new("BTC", 2), Coin::new("BNB", 1)]).unwrap();
        assert_eq!(coins.to_string(), "BNB:1;BTC:2");
        assert_eq!(Coins::new().to_string(), "");
    }

    #[test]
    fn zero_set() {
        assert!(Coins::of("BNB", 0).is_zero());
        assert_eq!(Coins::new().amount_of("BNB"), 0);
    }
}
