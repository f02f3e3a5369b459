//! Per-block fee accumulation.
//!
//! Fees merge in as transactions are delivered and the total is flushed into
//! a [`BlockFeeRecord`] when the block ends. The accumulator resets exactly
//! once per block boundary: either explicitly from `begin_block` or lazily
//! on the first merge carrying a new height, whichever comes first.

use std::collections::BTreeMap;

use blockdex_types::{Address, BlockFeeRecord, Coins, DexError, Fee, FeeMode, Result};

/// Running fee total for the current block.
#[derive(Debug, Clone)]
pub struct BlockFeeAccumulator {
    height: Option<i64>,
    total: Coins,
    mode: FeeMode,
    by_payer: BTreeMap<Address, Coins>,
}

impl BlockFeeAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            height: None,
            total: Coins::new(),
            mode: FeeMode::Free,
            by_payer: BTreeMap::new(),
        }
    }

    /// Start accumulating for `height`. Returns `true` if this call reset
    /// the total; repeated calls for the same height are no-ops.
    pub fn begin_block(&mut self, height: i64) -> bool {
        if self.height == Some(height) {
            return false;
        }
        self.height = Some(height);
        self.total = Coins::new();
        self.mode = FeeMode::Free;
        self.by_payer.clear();
        true
    }

    /// Add a fee charged to `payer` at `height`.
    pub fn merge(&mut self, height: i64, payer: Address, fee: &Fee) -> Result<()> {
        self.begin_block(height);
        if !fee.is_chargeable() {
            return Ok(());
        }
        let total = self.total.checked_plus(&fee.tokens).ok_or_else(|| overflow("block fee"))?;
        let paid = self
            .by_payer
            .get(&payer)
            .cloned()
            .unwrap_or_default()
            .checked_plus(&fee.tokens)
            .ok_or_else(|| overflow("payer fee"))?;
        self.total = total;
        self.mode = self.mode.merged_with(fee.mode);
        self.by_payer.insert(payer, paid);
        Ok(())
    }

    #[must_use]
    pub fn height(&self) -> Option<i64> {
        self.height
    }

    #[must_use]
    pub fn total(&self) -> &Coins {
        &self.total
    }

    #[must_use]
    pub fn mode(&self) -> FeeMode {
        self.mode
    }

    /// Fees `payer` has paid so far in this block.
    #[must_use]
    pub fn paid_by(&self, payer: &Address) -> Coins {
        self.by_payer.get(payer).cloned().unwrap_or_default()
    }

    /// Record of the block's fees. `SharedByValidators` lists the whole
    /// validator set, `SenderPays` only the proposer, an empty fee nobody.
    pub fn flush(&self, proposer: Address, validators: &[Address]) -> Result<BlockFeeRecord> {
        let height = self.height.ok_or(DexError::NoBlockInProgress)?;
        let recipients = if self.total.is_zero() {
            Vec::new()
        } else {
            match self.mode {
                FeeMode::SharedByValidators => validators.to_vec(),
                FeeMode::SenderPays => vec![proposer],
                FeeMode::Free => Vec::new(),
            }
        };
        Ok(BlockFeeRecord {
            height,
            fee: self.total.clone(),
            validators: recipients,
        })
    }
}

impl Default for BlockFeeAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn overflow(context: &str) -> DexError {
    DexError::AmountOverflow {
        context: context.to_string(),
    }
}
