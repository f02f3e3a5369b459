//! Execution context threaded through admission and message handling.

use std::fmt;

use blockdex_types::Account;

use crate::{AccountStore, BlockFeeAccumulator, GasMeter};

/// Whether a transaction is being dry-run or applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Mempool pre-check: fees are checked, never deducted.
    Check,
    /// Block execution: fees are deducted and accumulated.
    Deliver,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Check => write!(f, "CHECK"),
            Self::Deliver => write!(f, "DELIVER"),
        }
    }
}

/// Mutable state one admission operates on.
///
/// The account store and fee accumulator are borrowed from the block
/// driver; the gas meter and signer list are per transaction.
pub struct ExecutionContext<'a> {
    mode: RunMode,
    height: i64,
    store: &'a mut dyn AccountStore,
    block_fee: &'a mut BlockFeeAccumulator,
    gas: GasMeter,
    signers: Vec<Account>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        mode: RunMode,
        height: i64,
        store: &'a mut dyn AccountStore,
        block_fee: &'a mut BlockFeeAccumulator,
    ) -> Self {
        Self {
            mode,
            height,
            store,
            block_fee,
            gas: GasMeter::unmetered(),
            signers: Vec::new(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    #[must_use]
    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn store(&self) -> &dyn AccountStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn AccountStore {
        &mut *self.store
    }

    #[must_use]
    pub fn block_fee(&self) -> &BlockFeeAccumulator {
        self.block_fee
    }

    pub(crate) fn block_fee_mut(&mut self) -> &mut BlockFeeAccumulator {
        self.block_fee
    }

    #[must_use]
    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas
    }

    pub(crate) fn gas_meter_mut(&mut self) -> &mut GasMeter {
        &mut self.gas
    }

    /// Signer accounts as persisted by the last admission, in signer order.
    #[must_use]
    pub fn signers(&self) -> &[Account] {
        &self.signers
    }

    pub(crate) fn start_tx(&mut self, gas_limit: u64) {
        self.gas = GasMeter::new(gas_limit);
        self.signers.clear();
    }

    pub(crate) fn push_signer(&mut self, account: Account) {
        self.signers.push(account);
    }

    pub(crate) fn signers_mut(&mut self) -> &mut [Account] {
        &mut self.signers
    }
}
