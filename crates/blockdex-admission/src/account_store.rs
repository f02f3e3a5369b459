//! Account persistence.
//!
//! The gate and handlers only see the [`AccountStore`] trait. The in-memory
//! store backs the chain state; [`CacheStore`] buffers a transaction's
//! message writes so they land atomically or not at all.

use std::collections::BTreeMap;

use blockdex_types::{Account, Address};

/// Account lookup and persistence.
pub trait AccountStore {
    fn account(&self, address: &Address) -> Option<Account>;

    /// Insert or overwrite an account.
    fn set_account(&mut self, account: Account);

    /// Number the next created account receives.
    fn next_account_number(&self) -> u64;

    /// Create and persist an empty account for `address`.
    fn create_account(&mut self, address: Address) -> Account {
        let account = Account::new(address, self.next_account_number());
        self.set_account(account.clone());
        account
    }
}

// ---------------------------------------------------------------------------
// MemoryAccountStore
// ---------------------------------------------------------------------------

/// Ordered in-memory account table.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
    accounts: BTreeMap<Address, Account>,
    next_number: u64,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}

impl AccountStore for MemoryAccountStore {
    fn account(&self, address: &Address) -> Option<Account> {
        self.accounts.get(address).cloned()
    }

    fn set_account(&mut self, account: Account) {
        if account.account_number >= self.next_number {
            self.next_number = account.account_number + 1;
        }
        self.accounts.insert(account.address, account);
    }

    fn next_account_number(&self) -> u64 {
        self.next_number
    }
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

/// Write buffer over a parent store. Reads fall through; writes stay local
/// until [`CacheStore::write`].
pub struct CacheStore<'a> {
    parent: &'a mut dyn AccountStore,
    writes: BTreeMap<Address, Account>,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a mut dyn AccountStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Addresses written through this cache.
    pub fn dirty(&self) -> impl Iterator<Item = &Address> {
        self.writes.keys()
    }

    /// Flush buffered writes into the parent.
    pub fn write(self) {
        for (_, account) in self.writes {
            self.parent.set_account(account);
        }
    }
}

impl AccountStore for CacheStore<'_> {
    fn account(&self, address: &Address) -> Option<Account> {
        self.writes
            .get(address)
            .cloned()
            .or_else(|| self.parent.account(address))
    }

    fn set_account(&mut self, account: Account) {
        self.writes.insert(account.address, account);
    }

    fn next_account_number(&self) -> u64 {
        let buffered = self
            .writes
            .values()
            .map(|a| a.account_number + 1)
            .max()
            .unwrap_or(0);
        self.parent.next_account_number().max(buffered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdex_types::Coins;

    #[test]
    fn account_numbers_are_never_reused() {
        let mut store = MemoryAccountStore::new();
        let a = store.create_account(Address([1; 20]));
        let b = store.create_account(Address([2; 20]));
        assert_eq!(a.account_number, 0);
        assert_eq!(b.account_number, 1);
        store.set_account(a);
        assert_eq!(store.next_account_number(), 2);
    }

    #[test]
    fn cache_is_invisible_until_written() {
        let mut store = MemoryAccountStore::new();
        let mut acc = store.create_account(Address([1; 20]));
        {
            let mut cache = CacheStore::new(&mut store);
            acc.coins = Coins::of("BNB", 9);
            cache.set_account(acc.clone());
            assert_eq!(cache.account(&acc.address).unwrap().coins, Coins::of("BNB", 9));
            // dropped without write
        }
        assert!(store.account(&acc.address).unwrap().coins.is_zero());

        let mut cache = CacheStore::new(&mut store);
        cache.set_account(acc.clone());
        let fresh = cache.create_account(Address([2; 20]));
        assert_eq!(fresh.account_number, 1);
        assert_eq!(cache.dirty().count(), 2);
        cache.write();
        assert_eq!(store.account(&acc.address).unwrap().coins, Coins::of("BNB", 9));
        assert_eq!(store.len(), 2);
    }
}
