//! Aggregated order-book depth and the per-block book delta.

use std::collections::{BTreeMap, BTreeSet};

use blockdex_types::{OrderChange, Side};

use crate::events::Books;
use crate::lifecycle::change_delta;

/// One price level and its total resting quantity after the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: i64,
    pub last_qty: i64,
}

/// Changed levels of one symbol. Buys are sorted best (highest) first,
/// sells best (lowest) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBookDelta {
    pub symbol: String,
    pub buys: Vec<PriceLevel>,
    pub sells: Vec<PriceLevel>,
}

#[derive(Debug, Default, Clone)]
struct SymbolDepth {
    buys: BTreeMap<i64, i64>,
    sells: BTreeMap<i64, i64>,
}

impl SymbolDepth {
    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<i64, i64> {
        match side {
            Side::Buy => &mut self.buys,
            Side::Sell => &mut self.sells,
        }
    }

    fn side(&self, side: Side) -> &BTreeMap<i64, i64> {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }
}

/// Running depth of every book, fed with order changes block by block.
///
/// Levels that drain to zero are removed but still reported once (with
/// `last_qty = 0`) in the delta of the block that drained them.
#[derive(Debug, Default, Clone)]
pub struct DepthTracker {
    books: BTreeMap<String, SymbolDepth>,
    touched: BTreeSet<(String, Side, i64)>,
}

impl DepthTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one order change to its price level.
    pub fn apply(&mut self, change: &OrderChange) {
        let delta = change_delta(change);
        if delta == 0 {
            return;
        }
        let book = self.books.entry(change.symbol.clone()).or_default();
        let levels = book.side_mut(change.side);
        let total = levels.entry(change.price).or_insert(0);
        *total += delta;
        if *total < 0 {
            tracing::warn!(
                symbol = %change.symbol,
                side = %change.side,
                price = change.price,
                total = *total,
                "Depth went negative; clamping level to zero"
            );
            *total = 0;
        }
        if *total == 0 {
            levels.remove(&change.price);
        }
        self.touched
            .insert((change.symbol.clone(), change.side, change.price));
    }

    /// Resting quantity at a level.
    #[must_use]
    pub fn depth(&self, symbol: &str, side: Side, price: i64) -> i64 {
        self.books
            .get(symbol)
            .and_then(|b| b.side(side).get(&price).copied())
            .unwrap_or(0)
    }

    /// Drain the levels touched since the last call into a [`Books`] event.
    pub fn take_delta(&mut self, height: i64, timestamp: i64) -> Books {
        let mut deltas: BTreeMap<String, OrderBookDelta> = BTreeMap::new();
        for (symbol, side, price) in std::mem::take(&mut self.touched) {
            let last_qty = self.depth(&symbol, side, price);
            let delta = deltas
                .entry(symbol.clone())
                .or_insert_with(|| OrderBookDelta {
                    symbol,
                    buys: Vec::new(),
                    sells: Vec::new(),
                });
            let level = PriceLevel { price, last_qty };
            match side {
                Side::Buy => delta.buys.push(level),
                Side::Sell => delta.sells.push(level),
            }
        }
        let books = deltas
            .into_values()
            .map(|mut d| {
                d.buys.sort_by(|a, b| b.price.cmp(&a.price));
                d.sells.sort_by(|a, b| a.price.cmp(&b.price));
                d
            })
            .collect();
        Books {
            height,
            timestamp,
            books,
        }
    }
}
