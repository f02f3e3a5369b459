//! # blockdex-admission
//!
//! Transaction admission for the blockdex chain: the only path by which a
//! signed transaction may mutate chain state.
//!
//! ## Architecture
//!
//! - **[`TransactionAdmissionGate`]**: signature, sequence and account-number
//!   checks, key binding, fee charging
//! - **[`FeeCalculatorRegistry`]**: message type → fee function, built at startup
//! - **[`BlockFeeAccumulator`]**: per-block fee total, reset once per boundary
//! - **[`ExecutionContext`]** / **[`GasMeter`]**: per-transaction admission state
//! - **[`AccountStore`]**: account persistence seam ([`MemoryAccountStore`], [`CacheStore`])
//! - **[`DexKeeper`]**: order locks, cancels and transfers after admission
//! - **[`ChainApp`]**: begin/check/deliver/end/commit block driver
//!
//! ## Flow
//!
//! ```text
//! SignedTransaction
//!   → TransactionAdmissionGate::admit   (Verdict; sequence persisted per signer)
//!   → DexKeeper::handle per message     (CacheStore, all-or-nothing)
//!   → ChainApp::end_block               (BlockOutput for publication)
//! ```

pub mod account_store;
pub mod app;
pub mod block_fee;
pub mod context;
pub mod fee_registry;
pub mod gas;
pub mod gate;
pub mod handler;
pub mod verdict;

pub use account_store::{AccountStore, CacheStore, MemoryAccountStore};
pub use app::{ChainApp, ChainState};
pub use block_fee::BlockFeeAccumulator;
pub use context::{ExecutionContext, RunMode};
pub use fee_registry::{FeeCalculator, FeeCalculatorRegistry};
pub use gas::{GasMeter, OutOfGas};
pub use gate::TransactionAdmissionGate;
pub use handler::{DexKeeper, OpenOrder, TxEffects, TxEnv};
pub use verdict::{RejectReason, Rejection, Verdict};
