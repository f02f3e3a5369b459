//! Admission outcomes.
//!
//! A rejection is an ordinary value: the transaction is invalid, the node is
//! fine. Anything the node itself cannot recover from travels as
//! [`blockdex_types::DexError`] instead.

use std::fmt;

use blockdex_types::DexError;

/// Why a transaction was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    MalformedTx,
    UnknownAddress,
    SequenceMismatch,
    AccountNumberMismatch,
    SignatureInvalid,
    InsufficientFunds,
    OutOfGas,
    /// A message handler refused the order (bad symbol, duplicate id, ...).
    InvalidOrder,
}

impl RejectReason {
    /// Numeric result code reported to clients.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::MalformedTx => 101,
            Self::UnknownAddress => 102,
            Self::SequenceMismatch => 103,
            Self::AccountNumberMismatch => 104,
            Self::SignatureInvalid => 105,
            Self::InsufficientFunds => 106,
            Self::OutOfGas => 107,
            Self::InvalidOrder => 108,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedTx => write!(f, "MALFORMED_TX"),
            Self::UnknownAddress => write!(f, "UNKNOWN_ADDRESS"),
            Self::SequenceMismatch => write!(f, "SEQUENCE_MISMATCH"),
            Self::AccountNumberMismatch => write!(f, "ACCOUNT_NUMBER_MISMATCH"),
            Self::SignatureInvalid => write!(f, "SIGNATURE_INVALID"),
            Self::InsufficientFunds => write!(f, "INSUFFICIENT_FUNDS"),
            Self::OutOfGas => write!(f, "OUT_OF_GAS"),
            Self::InvalidOrder => write!(f, "INVALID_ORDER"),
        }
    }
}

/// A refusal with human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectReason,
    pub details: String,
}

impl Rejection {
    #[must_use]
    pub fn new(reason: RejectReason, details: impl Into<String>) -> Self {
        Self {
            reason,
            details: details.into(),
        }
    }

    /// Classify a handler error. Errors that are not about the transaction
    /// itself come back as `Err` so the caller propagates them.
    pub fn from_error(err: DexError) -> Result<Self, DexError> {
        let reason = match &err {
            DexError::InsufficientFunds { .. } => RejectReason::InsufficientFunds,
            DexError::InvalidOrder { .. }
            | DexError::OrderNotFound(_)
            | DexError::DuplicateOrder(_) => RejectReason::InvalidOrder,
            DexError::InvalidMessage { .. } => RejectReason::MalformedTx,
            DexError::UnknownAddress(_) => RejectReason::UnknownAddress,
            _ => return Err(err),
        };
        Ok(Self::new(reason, err.to_string()))
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.reason, self.reason.code(), self.details)
    }
}

/// Result of admitting a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Rejection),
}

impl Verdict {
    #[must_use]
    pub fn reject(reason: RejectReason, details: impl Into<String>) -> Self {
        Self::Reject(Rejection::new(reason, details))
    }

    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Reason for a rejection, `None` when accepted.
    #[must_use]
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Accept => None,
            Self::Reject(r) => Some(r.reason),
        }
    }
}
