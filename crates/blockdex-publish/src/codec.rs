//! Lowering of [`MarketEvent`]s into Avro values and encoding them against
//! the family schema.
//!
//! Values are built in schema field order. Optional sections are unions of
//! `null` and a record, so their branch index is always explicit.

use apache_avro::types::Value;
use blockdex_types::{
    AccountBalanceEvent, AssetBalance, BlockFeeRecord, Coins, OrderChange, Proposal, Trade,
    Transfer,
};
use thiserror::Error;

use crate::books::{OrderBookDelta, PriceLevel};
use crate::events::{Accounts, Books, ExecutionResults, MarketEvent, Transfers};
use crate::schemas::SchemaRegistry;

/// An event that cannot be encoded. Always a data-shape or configuration
/// bug, never transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("no schema registered for {0}")]
    UnknownFamily(String),

    #[error("{family} does not fit its schema: {reason}")]
    Schema { family: String, reason: String },
}

/// Encodes events with the registered schema of their family.
#[derive(Debug, Clone)]
pub struct EventCodec {
    registry: SchemaRegistry,
}

impl EventCodec {
    #[must_use]
    pub fn new(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn encode(&self, event: &MarketEvent) -> Result<Vec<u8>, CodecError> {
        let family = event.family();
        let schema = self
            .registry
            .get(family)
            .ok_or_else(|| CodecError::UnknownFamily(family.to_string()))?;
        apache_avro::to_avro_datum(schema, to_value(event)).map_err(|e| CodecError::Schema {
            family: family.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Lower an event into its schema-shaped record.
#[must_use]
pub fn to_value(event: &MarketEvent) -> Value {
    match event {
        MarketEvent::ExecutionResults(e) => execution_results(e),
        MarketEvent::Books(e) => books(e),
        MarketEvent::Accounts(e) => accounts(e),
        MarketEvent::BlockFee(e) => block_fee(e),
        MarketEvent::Transfers(e) => transfers(e),
    }
}

fn record(fields: Vec<(&str, Value)>) -> Value {
    Value::Record(
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

fn string(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

fn count(n: usize) -> Value {
    Value::Int(i32::try_from(n).unwrap_or(i32::MAX))
}

/// `["null", record]`; empty sections take the null branch.
fn nullable(section: Option<Value>) -> Value {
    match section {
        Some(value) => Value::Union(1, Box::new(value)),
        None => Value::Union(0, Box::new(Value::Null)),
    }
}

// ---------------------------------------------------------------------------
// ExecutionResults
// ---------------------------------------------------------------------------

fn execution_results(e: &ExecutionResults) -> Value {
    let orders: Vec<&OrderChange> = e
        .orders
        .iter()
        .filter(|o| {
            let publishable = o.status.is_publishable();
            if !publishable {
                tracing::error!(
                    height = e.height,
                    order = %o.order_id,
                    status = %o.status,
                    "Refusing to encode order change with unpublishable status"
                );
            }
            publishable
        })
        .collect();
    let total = e.trades.len() + orders.len() + e.proposals.len();

    let trades = (!e.trades.is_empty()).then(|| {
        record(vec![
            ("numOfMsgs", count(e.trades.len())),
            ("trades", Value::Array(e.trades.iter().map(trade).collect())),
        ])
    });
    let orders = (!orders.is_empty()).then(|| {
        record(vec![
            ("numOfMsgs", count(orders.len())),
            ("orders", Value::Array(orders.iter().copied().map(order).collect())),
        ])
    });
    let proposals = (!e.proposals.is_empty()).then(|| {
        record(vec![
            ("numOfMsgs", count(e.proposals.len())),
            ("proposals", Value::Array(e.proposals.iter().map(proposal).collect())),
        ])
    });
    record(vec![
        ("height", Value::Long(e.height)),
        ("timestamp", Value::Long(e.timestamp)),
        ("numOfMsgs", count(total)),
        ("trades", nullable(trades)),
        ("orders", nullable(orders)),
        ("proposals", nullable(proposals)),
    ])
}

fn trade(t: &Trade) -> Value {
    record(vec![
        ("id", string(&t.id)),
        ("symbol", string(&t.symbol)),
        ("price", Value::Long(t.price)),
        ("qty", Value::Long(t.qty)),
        ("sid", string(&t.sid)),
        ("bid", string(&t.bid)),
        ("sfee", string(&t.seller_fee)),
        ("bfee", string(&t.buyer_fee)),
        ("saddr", string(t.seller.to_string())),
        ("baddr", string(t.buyer.to_string())),
    ])
}

fn order(o: &OrderChange) -> Value {
    record(vec![
        ("symbol", string(&o.symbol)),
        ("status", string(o.status.as_str())),
        ("orderId", string(&o.order_id)),
        ("tradeId", string(&o.trade_id)),
        ("owner", string(o.owner.to_string())),
        ("side", Value::Int(o.side.code())),
        ("orderType", Value::Int(o.order_type.code())),
        ("price", Value::Long(o.price)),
        ("qty", Value::Long(o.qty)),
        ("lastExecutedPrice", Value::Long(o.last_executed_price)),
        ("lastExecutedQty", Value::Long(o.last_executed_qty)),
        ("cumQty", Value::Long(o.cum_qty)),
        ("fee", string(&o.fee)),
        ("orderCreationTime", Value::Long(o.order_creation_time)),
        ("transactionTime", Value::Long(o.transaction_time)),
        ("timeInForce", Value::Int(o.time_in_force.code())),
        ("currentExecutionType", string("NEW")),
        ("txHash", string(&o.tx_hash)),
    ])
}

fn proposal(p: &Proposal) -> Value {
    record(vec![
        ("id", Value::Long(p.id)),
        ("status", string(p.status.as_str())),
    ])
}

// ---------------------------------------------------------------------------
// Books / Accounts / BlockFee / Transfers
// ---------------------------------------------------------------------------

fn books(e: &Books) -> Value {
    record(vec![
        ("height", Value::Long(e.height)),
        ("timestamp", Value::Long(e.timestamp)),
        ("numOfMsgs", count(e.books.len())),
        ("books", Value::Array(e.books.iter().map(book_delta).collect())),
    ])
}

fn book_delta(d: &OrderBookDelta) -> Value {
    record(vec![
        ("symbol", string(&d.symbol)),
        ("buys", Value::Array(d.buys.iter().map(price_level).collect())),
        ("sells", Value::Array(d.sells.iter().map(price_level).collect())),
    ])
}

fn price_level(l: &PriceLevel) -> Value {
    record(vec![
        ("price", Value::Long(l.price)),
        ("lastQty", Value::Long(l.last_qty)),
    ])
}

fn accounts(e: &Accounts) -> Value {
    record(vec![
        ("height", Value::Long(e.height)),
        ("numOfMsgs", count(e.accounts.len())),
        ("accounts", Value::Array(e.accounts.iter().map(account).collect())),
    ])
}

fn account(a: &AccountBalanceEvent) -> Value {
    record(vec![
        ("owner", string(a.owner.to_string())),
        ("fee", string(&a.fee)),
        ("balances", Value::Array(a.balances.iter().map(balance).collect())),
    ])
}

fn balance(b: &AssetBalance) -> Value {
    record(vec![
        ("asset", string(&b.asset)),
        ("free", Value::Long(b.free)),
        ("frozen", Value::Long(b.frozen)),
        ("locked", Value::Long(b.locked)),
    ])
}

fn block_fee(e: &BlockFeeRecord) -> Value {
    record(vec![
        ("height", Value::Long(e.height)),
        ("fee", string(e.fee.to_string())),
        (
            "validators",
            Value::Array(e.validators.iter().map(|v| string(v.to_string())).collect()),
        ),
    ])
}

fn transfers(e: &Transfers) -> Value {
    record(vec![
        ("height", Value::Long(e.height)),
        ("num", count(e.transfers.len())),
        ("timestamp", Value::Long(e.timestamp)),
        ("transfers", Value::Array(e.transfers.iter().map(transfer).collect())),
    ])
}

fn transfer(t: &Transfer) -> Value {
    let to = t
        .to
        .iter()
        .map(|r| {
            record(vec![
                ("addr", string(r.address.to_string())),
                ("coins", coins(&r.coins)),
            ])
        })
        .collect();
    record(vec![
        ("txhash", string(&t.tx_hash)),
        ("from", string(t.from.to_string())),
        ("to", Value::Array(to)),
    ])
}

fn coins(c: &Coins) -> Value {
    Value::Array(
        c.iter()
            .map(|coin| {
                record(vec![
                    ("denom", string(&coin.denom)),
                    ("amount", Value::Long(coin.amount)),
                ])
            })
            .collect(),
    )
}
