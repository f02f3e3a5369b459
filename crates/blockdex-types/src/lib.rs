//! # blockdex-types
//!
//! Shared types, errors, and configuration for the **blockdex** exchange
//! chain core.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`Address`], [`PubKey`], [`TxHash`]
//! - **Value model**: [`Coin`], [`Coins`], [`Account`], [`AssetBalance`]
//! - **Fees**: [`Fee`], [`FeeMode`], [`BlockFeeRecord`]
//! - **Transactions**: [`SignedTransaction`], [`Msg`], [`StdFee`], [`StdSignature`], [`TxBuilder`]
//! - **Market events**: [`OrderChange`], [`OrderStatus`], [`Trade`], [`Transfer`],
//!   [`AccountBalanceEvent`], [`BlockOutput`], [`MessageFamily`]
//! - **Configuration**: [`AdmissionConfig`], [`PublicationConfig`]
//! - **Errors**: [`DexError`] with `BDX_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod account;
pub mod block;
pub mod coins;
pub mod config;
pub mod constants;
pub mod error;
pub mod family;
pub mod fee;
pub mod ids;
pub mod order;
pub mod trade;
pub mod transfer;
pub mod tx;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-export all primary types at crate root for ergonomic imports:
//   use blockdex_types::{Account, Coins, SignedTransaction, ...};

pub use account::*;
pub use block::*;
pub use coins::*;
pub use config::*;
pub use error::*;
pub use family::*;
pub use fee::*;
pub use ids::*;
pub use order::*;
pub use trade::*;
pub use transfer::*;
pub use tx::*;

// Constants are accessed via `blockdex_types::constants::FOO`
// (not re-exported to avoid name collisions).
