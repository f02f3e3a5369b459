//! Turns one committed block into its market events.

use blockdex_types::BlockOutput;

use crate::books::DepthTracker;
use crate::events::{Accounts, ExecutionResults, MarketEvent, Transfers};

/// Builds the per-family events of each block, carrying book depth across
/// blocks.
#[derive(Debug, Default, Clone)]
pub struct BlockEventAssembler {
    depth: DepthTracker,
}

impl BlockEventAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depth(&self) -> &DepthTracker {
        &self.depth
    }

    /// One event per family, in [`blockdex_types::MessageFamily::ALL`] order.
    pub fn assemble(&mut self, block: &BlockOutput) -> Vec<MarketEvent> {
        let results = ExecutionResults::new(
            block.height,
            block.timestamp,
            block.trades.clone(),
            block.orders.clone(),
            block.proposals.clone(),
        );
        for change in &results.orders {
            self.depth.apply(change);
        }
        let books = self.depth.take_delta(block.height, block.timestamp);

        tracing::debug!(
            height = block.height,
            orders = results.orders.len(),
            trades = results.trades.len(),
            symbols = books.books.len(),
            "Assembled block events"
        );

        vec![
            MarketEvent::Accounts(Accounts {
                height: block.height,
                accounts: block.accounts.clone(),
            }),
            MarketEvent::Books(books),
            MarketEvent::ExecutionResults(results),
            MarketEvent::BlockFee(block.fee.clone()),
            MarketEvent::Transfers(Transfers {
                height: block.height,
                timestamp: block.timestamp,
                transfers: block.transfers.clone(),
            }),
        ]
    }
}
