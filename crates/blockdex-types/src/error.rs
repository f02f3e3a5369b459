//! Error types for the blockdex core.
//!
//! All errors use the `BDX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / message errors
//! - 2xx: Balance errors
//! - 3xx: Admission errors
//! - 5xx: Codec / schema errors
//! - 6xx: Delivery errors
//! - 9xx: General / internal errors
//!
//! Admission rejections (bad signature, stale sequence, ...) are not errors:
//! they are verdict values. `DexError` covers the conditions a caller cannot
//! treat as an ordinary "no".

use thiserror::Error;

use crate::Address;

/// Central error enum for all blockdex operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DexError {
    // =================================================================
    // Order / Message Errors (1xx)
    // =================================================================
    /// The order failed validation (bad symbol, non-positive amounts, ...).
    #[error("BDX_ERR_100: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The referenced order is not open.
    #[error("BDX_ERR_101: Order not found: {0}")]
    OrderNotFound(String),

    /// An open order with this ID already exists.
    #[error("BDX_ERR_102: Order already exists: {0}")]
    DuplicateOrder(String),

    /// The message is structurally invalid.
    #[error("BDX_ERR_103: Invalid message: {reason}")]
    InvalidMessage { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough free balance to perform the operation.
    #[error("BDX_ERR_200: Insufficient funds: {reason}")]
    InsufficientFunds { reason: String },

    /// A coin amount left the representable range.
    #[error("BDX_ERR_201: Amount overflow in {context}")]
    AmountOverflow { context: String },

    // =================================================================
    // Admission Errors (3xx)
    // =================================================================
    /// No account exists for the address.
    #[error("BDX_ERR_300: Unknown address: {0}")]
    UnknownAddress(Address),

    /// No fee calculator is registered for the message type. Fatal: the
    /// registry is incomplete and the node must not keep admitting.
    #[error("BDX_ERR_301: No fee calculator registered for message type {msg_type}")]
    MissingFeeCalculator { msg_type: String },

    /// A block-scoped operation was attempted outside a block.
    #[error("BDX_ERR_302: No block in progress")]
    NoBlockInProgress,

    // =================================================================
    // Codec / Schema Errors (5xx)
    // =================================================================
    /// A static schema text could not be parsed.
    #[error("BDX_ERR_500: Invalid schema for {family}: {reason}")]
    InvalidSchema { family: String, reason: String },

    // =================================================================
    // Delivery Errors (6xx)
    // =================================================================
    /// A broker connection could not be established.
    #[error("BDX_ERR_600: Broker connection failed for topic {topic}: {reason}")]
    BrokerConnection { topic: String, reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BDX_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("BDX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("BDX_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("BDX_ERR_903: I/O error: {0}")]
    Io(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, DexError>;

impl From<std::io::Error> for DexError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = DexError::OrderNotFound("abc-1".into());
        let msg = format!("{err}");
        assert!(msg.starts_with("BDX_ERR_101"), "Got: {msg}");
        assert!(msg.contains("abc-1"));
    }

    #[test]
    fn missing_calculator_names_type() {
        let err = DexError::MissingFeeCalculator {
            msg_type: "orderNew".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("BDX_ERR_301"));
        assert!(msg.contains("orderNew"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DexError = io.into();
        assert!(matches!(err, DexError::Io(ref m) if m.contains("gone")), "Got: {err}");
    }

    #[test]
    fn all_errors_have_bdx_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(DexError::NoBlockInProgress),
            Box::new(DexError::UnknownAddress(Address([7; 20]))),
            Box::new(DexError::Internal("test".into())),
            Box::new(DexError::InvalidSchema {
                family: "Books".into(),
                reason: "bad".into(),
            }),
            Box::new(DexError::AmountOverflow {
                context: "fee".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("BDX_ERR_"),
                "Error missing BDX_ERR_ prefix: {msg}"
            );
        }
    }
}
