//! System-wide constants for the blockdex core.

/// Fixed-point scale for prices and quantities (8 decimal places).
pub const FIXED_POINT_SCALE: i64 = 100_000_000;

/// Maximum memo length in characters.
pub const MAX_MEMO_CHARACTERS: usize = 100;

/// Gas charged per memo byte.
pub const MEMO_COST_PER_BYTE: u64 = 1;

/// Gas charged per signature verification.
pub const SIG_VERIFY_COST: u64 = 100;

/// Gas charged for deducting the transaction fee.
pub const DEDUCT_FEES_COST: u64 = 10;

/// Separator between broker endpoints in a family's `brokers` setting.
pub const BROKER_LIST_SEPARATOR: char = ';';

/// Default directory for essential fallback records.
pub const DEFAULT_ESSENTIAL_LOG_DIR: &str = "essential";

/// Default client identifier presented to brokers.
pub const DEFAULT_CLIENT_ID: &str = "blockdex-publisher";

/// Largest payload accepted by the producer (100 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 100 * 1024 * 1024;

/// Connection-layer retries performed inside a broker client.
pub const DEFAULT_PRODUCER_MAX_RETRIES: u32 = 20;

/// Base unit of the publication backoff in milliseconds.
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1_000;

/// Upper bound on a single backoff interval in milliseconds.
pub const DEFAULT_BACKOFF_MAX_INTERVAL_MS: u64 = 60_000;

/// Consecutive retriable failures before a stall alert is raised.
pub const DEFAULT_STALL_ALERT_AFTER: u32 = 5;
