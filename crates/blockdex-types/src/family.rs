//! Market-data message families.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A category of published market data. Each family has its own schema,
/// topic, and enable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum MessageFamily {
    Accounts,
    Books,
    ExecutionResults,
    BlockFee,
    Transfers,
}

impl MessageFamily {
    pub const ALL: [MessageFamily; 5] = [
        Self::Accounts,
        Self::Books,
        Self::ExecutionResults,
        Self::BlockFee,
        Self::Transfers,
    ];

    /// Name used in delivery keys and essential log file names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accounts => "Accounts",
            Self::Books => "Books",
            Self::ExecutionResults => "ExecutionResults",
            Self::BlockFee => "BlockFee",
            Self::Transfers => "Transfers",
        }
    }
}

impl fmt::Display for MessageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
