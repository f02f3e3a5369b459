//! Market-data events, one variant per message family.
//!
//! Each family can produce an *empty copy* (same height, no messages),
//! published as a placeholder when the real event cannot be delivered, and
//! an *essential message*: the minimal text needed to recover the event
//! offline.

use std::fmt;

use blockdex_types::{
    AccountBalanceEvent, BlockFeeRecord, MessageFamily, OrderChange, Proposal, Trade, Transfer,
};

use crate::books::OrderBookDelta;

// ---------------------------------------------------------------------------
// Family payloads
// ---------------------------------------------------------------------------

/// Trades, order changes and proposal outcomes of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResults {
    pub height: i64,
    pub timestamp: i64,
    pub trades: Vec<Trade>,
    pub orders: Vec<OrderChange>,
    pub proposals: Vec<Proposal>,
}

impl ExecutionResults {
    /// Assemble a block's results. Order changes whose status is not
    /// publishable are logged and dropped here, before anything is encoded.
    #[must_use]
    pub fn new(
        height: i64,
        timestamp: i64,
        trades: Vec<Trade>,
        orders: Vec<OrderChange>,
        proposals: Vec<Proposal>,
    ) -> Self {
        let orders = orders
            .into_iter()
            .filter(|o| {
                let keep = o.status.is_publishable();
                if !keep {
                    tracing::error!(
                        height,
                        order = %o.order_id,
                        status = %o.status,
                        "Dropping order change with unpublishable status"
                    );
                }
                keep
            })
            .collect();
        Self {
            height,
            timestamp,
            trades,
            orders,
            proposals,
        }
    }

    #[must_use]
    pub fn num_of_msgs(&self) -> usize {
        self.trades.len() + self.orders.len() + self.proposals.len()
    }
}

/// Changed price levels of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Books {
    pub height: i64,
    pub timestamp: i64,
    pub books: Vec<OrderBookDelta>,
}

/// Balances of the accounts a block touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accounts {
    pub height: i64,
    pub accounts: Vec<AccountBalanceEvent>,
}

/// Coin transfers of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfers {
    pub height: i64,
    pub timestamp: i64,
    pub transfers: Vec<Transfer>,
}

// ---------------------------------------------------------------------------
// MarketEvent
// ---------------------------------------------------------------------------

/// One publishable event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketEvent {
    Accounts(Accounts),
    Books(Books),
    ExecutionResults(ExecutionResults),
    BlockFee(BlockFeeRecord),
    Transfers(Transfers),
}

impl MarketEvent {
    #[must_use]
    pub fn family(&self) -> MessageFamily {
        match self {
            Self::Accounts(_) => MessageFamily::Accounts,
            Self::Books(_) => MessageFamily::Books,
            Self::ExecutionResults(_) => MessageFamily::ExecutionResults,
            Self::BlockFee(_) => MessageFamily::BlockFee,
            Self::Transfers(_) => MessageFamily::Transfers,
        }
    }

    #[must_use]
    pub fn height(&self) -> i64 {
        match self {
            Self::Accounts(e) => e.height,
            Self::Books(e) => e.height,
            Self::ExecutionResults(e) => e.height,
            Self::BlockFee(e) => e.height,
            Self::Transfers(e) => e.height,
        }
    }

    /// Same family and height, no messages.
    #[must_use]
    pub fn empty_copy(&self) -> MarketEvent {
        match self {
            Self::Accounts(e) => Self::Accounts(Accounts {
                height: e.height,
                accounts: Vec::new(),
            }),
            Self::Books(e) => Self::Books(Books {
                height: e.height,
                timestamp: e.timestamp,
                books: Vec::new(),
            }),
            Self::ExecutionResults(e) => Self::ExecutionResults(ExecutionResults {
                height: e.height,
                timestamp: e.timestamp,
                trades: Vec::new(),
                orders: Vec::new(),
                proposals: Vec::new(),
            }),
            Self::BlockFee(e) => Self::BlockFee(BlockFeeRecord {
                height: e.height,
                fee: blockdex_types::Coins::new(),
                validators: Vec::new(),
            }),
            Self::Transfers(e) => Self::Transfers(Transfers {
                height: e.height,
                timestamp: e.timestamp,
                transfers: Vec::new(),
            }),
        }
    }

    /// Line-oriented recovery text.
    #[must_use]
    pub fn essential_msg(&self) -> String {
        self.essential_lines()
            .into_iter()
            .map(|line| line + "\n")
            .collect()
    }

    fn essential_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("height:{}", self.height())];
        match self {
            Self::ExecutionResults(e) => {
                lines.push(format!("time:{}", e.timestamp));
                lines.push("orders:".into());
                lines.extend(e.orders.iter().map(|o| {
                    format!(
                        "{},{},{},{},{},{},{}",
                        o.order_id, o.symbol, o.status, o.owner, o.cum_qty, o.last_executed_qty, o.fee
                    )
                }));
                lines.push("trades:".into());
                lines.extend(e.trades.iter().map(|t| {
                    format!(
                        "{},{},{},{},{},{},{},{}",
                        t.id, t.symbol, t.price, t.qty, t.sid, t.bid, t.seller_fee, t.buyer_fee
                    )
                }));
                lines.push("proposals:".into());
                lines.extend(e.proposals.iter().map(|p| format!("{},{}", p.id, p.status.as_str())));
            }
            Self::Books(e) => {
                for book in &e.books {
                    lines.push(book.symbol.clone());
                    lines.push(levels("buys", &book.buys));
                    lines.push(levels("sells", &book.sells));
                }
            }
            Self::Accounts(e) => {
                for account in &e.accounts {
                    lines.push(account.owner.to_string());
                    lines.push(format!("fee:{}", account.fee));
                    lines.extend(
                        account
                            .balances
                            .iter()
                            .map(|b| format!("{}:{}:{}:{}", b.asset, b.free, b.frozen, b.locked)),
                    );
                }
            }
            Self::BlockFee(e) => {
                lines.push(format!("fee:{}", e.fee));
                let validators: Vec<String> = e.validators.iter().map(ToString::to_string).collect();
                lines.push(format!("validators:{}", validators.join(",")));
            }
            Self::Transfers(e) => {
                for t in &e.transfers {
                    lines.push(format!("{},{}", t.tx_hash, t.from));
                    lines.extend(t.to.iter().map(|r| format!("->{}:{}", r.address, r.coins)));
                }
            }
        }
        lines
    }
}

fn levels(side: &str, levels: &[crate::books::PriceLevel]) -> String {
    let levels: Vec<String> = levels
        .iter()
        .map(|level| format!("{}@{}", level.last_qty, level.price))
        .collect();
    format!("{side}:{}", levels.join(","))
}

impl fmt::Display for MarketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionResults(e) => write!(
                f,
                "ExecutionResults height:{} trades:{} orders:{} proposals:{}",
                e.height,
                e.trades.len(),
                e.orders.len(),
                e.proposals.len()
            ),
            Self::Books(e) => write!(f, "Books height:{} symbols:{}", e.height, e.books.len()),
            Self::Accounts(e) => {
                write!(f, "Accounts height:{} accounts:{}", e.height, e.accounts.len())
            }
            Self::BlockFee(e) => write!(
                f,
                "BlockFee height:{} fee:{} validators:{}",
                e.height,
                e.fee,
                e.validators.len()
            ),
            Self::Transfers(e) => {
                write!(f, "Transfers height:{} transfers:{}", e.height, e.transfers.len())
            }
        }
    }
}
