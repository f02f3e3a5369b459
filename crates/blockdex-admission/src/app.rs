//! Block-processing driver.
//!
//! [`ChainApp`] owns two copies of chain state: *deliver* state, mutated by
//! the block in progress, and *check* state, used to dry-run mempool
//! transactions. `commit` makes check state catch up with deliver state.
//!
//! ```text
//! begin_block(h, t) ─► deliver_tx* ─► end_block(proposer, validators) ─► commit
//!                                          │
//!                                          └─► BlockOutput (fees, orders, transfers, balances)
//! ```

use std::collections::BTreeSet;

use blockdex_types::{
    Account, AccountBalanceEvent, Address, BlockOutput, DexError, OrderChange, Result,
    SignedTransaction, Transfer,
};

use crate::handler::{DexKeeper, TxEffects, TxEnv};
use crate::{
    AccountStore, BlockFeeAccumulator, CacheStore, ExecutionContext, MemoryAccountStore,
    Rejection, RunMode, TransactionAdmissionGate, Verdict,
};

/// Accounts plus open orders.
#[derive(Debug, Clone, Default)]
pub struct ChainState {
    pub accounts: MemoryAccountStore,
    pub dex: DexKeeper,
}

#[derive(Debug)]
struct BlockInProgress {
    height: i64,
    timestamp: i64,
    txs: usize,
    rejected: usize,
    orders: Vec<OrderChange>,
    transfers: Vec<Transfer>,
    touched: BTreeSet<Address>,
}

/// What running one transaction produced.
struct TxOutcome {
    verdict: Verdict,
    effects: Option<TxEffects>,
    touched: Vec<Address>,
}

/// Drives admission and message execution block by block.
#[derive(Debug)]
pub struct ChainApp {
    gate: TransactionAdmissionGate,
    deliver: ChainState,
    check: ChainState,
    block_fee: BlockFeeAccumulator,
    /// Scratch accumulator for check mode, which never charges.
    check_fee: BlockFeeAccumulator,
    last_height: i64,
    block: Option<BlockInProgress>,
}

impl ChainApp {
    #[must_use]
    pub fn new(gate: TransactionAdmissionGate) -> Self {
        Self {
            gate,
            deliver: ChainState::default(),
            check: ChainState::default(),
            block_fee: BlockFeeAccumulator::new(),
            check_fee: BlockFeeAccumulator::new(),
            last_height: 0,
            block: None,
        }
    }

    /// Seed both states with genesis accounts.
    pub fn init_genesis(&mut self, accounts: impl IntoIterator<Item = Account>) {
        for account in accounts {
            self.deliver.accounts.set_account(account.clone());
            self.check.accounts.set_account(account);
        }
    }

    /// Account as of the block in progress.
    #[must_use]
    pub fn account(&self, address: &Address) -> Option<Account> {
        self.deliver.accounts.account(address)
    }

    /// Account as seen by mempool checks.
    #[must_use]
    pub fn check_account(&self, address: &Address) -> Option<Account> {
        self.check.accounts.account(address)
    }

    #[must_use]
    pub fn dex(&self) -> &DexKeeper {
        &self.deliver.dex
    }

    #[must_use]
    pub fn block_fee(&self) -> &BlockFeeAccumulator {
        &self.block_fee
    }

    pub fn begin_block(&mut self, height: i64, timestamp: i64) -> Result<()> {
        if let Some(block) = &self.block {
            return Err(DexError::Internal(format!(
                "block {} still in progress when beginning {height}",
                block.height
            )));
        }
        self.block_fee.begin_block(height);
        self.block = Some(BlockInProgress {
            height,
            timestamp,
            txs: 0,
            rejected: 0,
            orders: Vec::new(),
            transfers: Vec::new(),
            touched: BTreeSet::new(),
        });
        Ok(())
    }

    /// Dry-run `tx` against check state. Sequence numbers advance in check
    /// state so consecutive mempool transactions from one account line up.
    pub fn check_tx(&mut self, tx: &SignedTransaction) -> Result<Verdict> {
        let env = TxEnv {
            height: self.last_height + 1,
            timestamp: 0,
            tx_hash: tx.hash()?.to_string(),
        };
        let outcome = run_tx(
            &self.gate,
            &mut self.check,
            &mut self.check_fee,
            RunMode::Check,
            &env,
            tx,
        )?;
        if let Verdict::Reject(rejection) = &outcome.verdict {
            tracing::debug!(tx = %env.tx_hash, %rejection, "Check rejected transaction");
        }
        Ok(outcome.verdict)
    }

    /// Execute `tx` in the block in progress.
    pub fn deliver_tx(&mut self, tx: &SignedTransaction) -> Result<Verdict> {
        let block = self.block.as_mut().ok_or(DexError::NoBlockInProgress)?;
        let env = TxEnv {
            height: block.height,
            timestamp: block.timestamp,
            tx_hash: tx.hash()?.to_string(),
        };
        let outcome = run_tx(
            &self.gate,
            &mut self.deliver,
            &mut self.block_fee,
            RunMode::Deliver,
            &env,
            tx,
        )?;

        block.txs += 1;
        block.touched.extend(outcome.touched);
        match outcome.effects {
            Some(effects) => {
                block.orders.extend(effects.orders);
                block.transfers.extend(effects.transfers);
            }
            None => {
                block.rejected += 1;
                if let Verdict::Reject(rejection) = &outcome.verdict {
                    tracing::warn!(
                        height = env.height,
                        tx = %env.tx_hash,
                        %rejection,
                        "Transaction rejected"
                    );
                }
            }
        }
        Ok(outcome.verdict)
    }

    /// Close the block and collect everything it produced.
    pub fn end_block(&mut self, proposer: Address, validators: &[Address]) -> Result<BlockOutput> {
        let block = self.block.take().ok_or(DexError::NoBlockInProgress)?;
        let fee = self.block_fee.flush(proposer, validators)?;

        let accounts: Vec<AccountBalanceEvent> = block
            .touched
            .iter()
            .filter_map(|address| self.deliver.accounts.account(address))
            .map(|account| {
                AccountBalanceEvent::snapshot(&account, &self.block_fee.paid_by(&account.address))
            })
            .collect();

        tracing::info!(
            height = block.height,
            txs = block.txs,
            rejected = block.rejected,
            orders = block.orders.len(),
            transfers = block.transfers.len(),
            fee = %fee.fee,
            "Block complete"
        );
        self.last_height = block.height;

        Ok(BlockOutput {
            height: block.height,
            timestamp: block.timestamp,
            fee,
            orders: block.orders,
            trades: Vec::new(),
            proposals: Vec::new(),
            transfers: block.transfers,
            accounts,
        })
    }

    /// Make check state match the committed deliver state.
    pub fn commit(&mut self) {
        self.check = self.deliver.clone();
    }
}

fn run_tx(
    gate: &TransactionAdmissionGate,
    state: &mut ChainState,
    block_fee: &mut BlockFeeAccumulator,
    mode: RunMode,
    env: &TxEnv,
    tx: &SignedTransaction,
) -> Result<TxOutcome> {
    let (verdict, signers) = {
        let mut ctx = ExecutionContext::new(mode, env.height, &mut state.accounts, block_fee);
        let verdict = gate.admit(tx, &mut ctx)?;
        let signers: Vec<Address> = ctx.signers().iter().map(|a| a.address).collect();
        (verdict, signers)
    };
    if !verdict.is_accept() {
        return Ok(TxOutcome {
            verdict,
            effects: None,
            touched: signers,
        });
    }

    let mut effects = TxEffects::default();
    let mut cache = CacheStore::new(&mut state.accounts);
    for msg in &tx.msgs {
        if let Err(err) = state.dex.handle(msg, &mut cache, env, &mut effects) {
            let rejection = Rejection::from_error(err)?;
            return Ok(TxOutcome {
                verdict: Verdict::Reject(rejection),
                effects: None,
                touched: signers,
            });
        }
    }
    let mut touched = signers;
    touched.extend(cache.dirty().copied());
    cache.write();
    state.dex.apply(&effects);

    Ok(TxOutcome {
        verdict: Verdict::Accept,
        effects: Some(effects),
        touched,
    })
}
