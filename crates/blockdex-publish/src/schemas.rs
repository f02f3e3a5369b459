//! Fixed schema per message family.
//!
//! The schema texts are static configuration shared with downstream
//! consumers; changing one is a wire-format change.

use std::collections::HashMap;

use blockdex_types::{DexError, MessageFamily, Result};

use apache_avro::Schema;

pub const EXECUTION_RESULTS_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "ExecutionResults",
  "namespace": "org.blockdex.msg",
  "fields": [
    {"name": "height", "type": "long"},
    {"name": "timestamp", "type": "long"},
    {"name": "numOfMsgs", "type": "int"},
    {"name": "trades", "type": ["null", {
      "type": "record",
      "name": "Trades",
      "fields": [
        {"name": "numOfMsgs", "type": "int"},
        {"name": "trades", "type": {"type": "array", "items": {
          "type": "record",
          "name": "Trade",
          "fields": [
            {"name": "id", "type": "string"},
            {"name": "symbol", "type": "string"},
            {"name": "price", "type": "long"},
            {"name": "qty", "type": "long"},
            {"name": "sid", "type": "string"},
            {"name": "bid", "type": "string"},
            {"name": "sfee", "type": "string"},
            {"name": "bfee", "type": "string"},
            {"name": "saddr", "type": "string"},
            {"name": "baddr", "type": "string"}
          ]
        }}}
      ]
    }], "default": null},
    {"name": "orders", "type": ["null", {
      "type": "record",
      "name": "Orders",
      "fields": [
        {"name": "numOfMsgs", "type": "int"},
        {"name": "orders", "type": {"type": "array", "items": {
          "type": "record",
          "name": "Order",
          "fields": [
            {"name": "symbol", "type": "string"},
            {"name": "status", "type": "string"},
            {"name": "orderId", "type": "string"},
            {"name": "tradeId", "type": "string"},
            {"name": "owner", "type": "string"},
            {"name": "side", "type": "int"},
            {"name": "orderType", "type": "int"},
            {"name": "price", "type": "long"},
            {"name": "qty", "type": "long"},
            {"name": "lastExecutedPrice", "type": "long"},
            {"name": "lastExecutedQty", "type": "long"},
            {"name": "cumQty", "type": "long"},
            {"name": "fee", "type": "string"},
            {"name": "orderCreationTime", "type": "long"},
            {"name": "transactionTime", "type": "long"},
            {"name": "timeInForce", "type": "int"},
            {"name": "currentExecutionType", "type": "string"},
            {"name": "txHash", "type": "string"}
          ]
        }}}
      ]
    }], "default": null},
    {"name": "proposals", "type": ["null", {
      "type": "record",
      "name": "Proposals",
      "fields": [
        {"name": "numOfMsgs", "type": "int"},
        {"name": "proposals", "type": {"type": "array", "items": {
          "type": "record",
          "name": "Proposal",
          "fields": [
            {"name": "id", "type": "long"},
            {"name": "status", "type": "string"}
          ]
        }}}
      ]
    }], "default": null}
  ]
}
"#;

pub const BOOKS_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "Books",
  "namespace": "org.blockdex.msg",
  "fields": [
    {"name": "height", "type": "long"},
    {"name": "timestamp", "type": "long"},
    {"name": "numOfMsgs", "type": "int"},
    {"name": "books", "type": {"type": "array", "items": {
      "type": "record",
      "name": "OrderBookDelta",
      "fields": [
        {"name": "symbol", "type": "string"},
        {"name": "buys", "type": {"type": "array", "items": {
          "type": "record",
          "name": "PriceLevel",
          "fields": [
            {"name": "price", "type": "long"},
            {"name": "lastQty", "type": "long"}
          ]
        }}},
        {"name": "sells", "type": {"type": "array", "items": "PriceLevel"}}
      ]
    }}}
  ]
}
"#;

pub const ACCOUNTS_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "Accounts",
  "namespace": "org.blockdex.msg",
  "fields": [
    {"name": "height", "type": "long"},
    {"name": "numOfMsgs", "type": "int"},
    {"name": "accounts", "type": {"type": "array", "items": {
      "type": "record",
      "name": "Account",
      "fields": [
        {"name": "owner", "type": "string"},
        {"name": "fee", "type": "string"},
        {"name": "balances", "type": {"type": "array", "items": {
          "type": "record",
          "name": "AssetBalance",
          "fields": [
            {"name": "asset", "type": "string"},
            {"name": "free", "type": "long"},
            {"name": "frozen", "type": "long"},
            {"name": "locked", "type": "long"}
          ]
        }}}
      ]
    }}}
  ]
}
"#;

pub const BLOCK_FEE_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "BlockFee",
  "namespace": "org.blockdex.msg",
  "fields": [
    {"name": "height", "type": "long"},
    {"name": "fee", "type": "string"},
    {"name": "validators", "type": {"type": "array", "items": "string"}}
  ]
}
"#;

pub const TRANSFERS_SCHEMA: &str = r#"
{
  "type": "record",
  "name": "Transfers",
  "namespace": "org.blockdex.msg",
  "fields": [
    {"name": "height", "type": "long"},
    {"name": "num", "type": "int"},
    {"name": "timestamp", "type": "long"},
    {"name": "transfers", "type": {"type": "array", "items": {
      "type": "record",
      "name": "Transfer",
      "fields": [
        {"name": "txhash", "type": "string"},
        {"name": "from", "type": "string"},
        {"name": "to", "type": {"type": "array", "items": {
          "type": "record",
          "name": "Receiver",
          "fields": [
            {"name": "addr", "type": "string"},
            {"name": "coins", "type": {"type": "array", "items": {
              "type": "record",
              "name": "Coin",
              "fields": [
                {"name": "denom", "type": "string"},
                {"name": "amount", "type": "long"}
              ]
            }}}
          ]
        }}}
      ]
    }}}
  ]
}
"#;

/// Schema text for `family`.
#[must_use]
pub fn schema_text(family: MessageFamily) -> &'static str {
    match family {
        MessageFamily::Accounts => ACCOUNTS_SCHEMA,
        MessageFamily::Books => BOOKS_SCHEMA,
        MessageFamily::ExecutionResults => EXECUTION_RESULTS_SCHEMA,
        MessageFamily::BlockFee => BLOCK_FEE_SCHEMA,
        MessageFamily::Transfers => TRANSFERS_SCHEMA,
    }
}

/// Parsed schemas, one per family.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<MessageFamily, Schema>,
}

impl SchemaRegistry {
    /// Parse the built-in schema of every family.
    pub fn standard() -> Result<Self> {
        Self::from_texts(MessageFamily::ALL.iter().map(|f| (*f, schema_text(*f))))
    }

    /// Parse caller-provided schema texts.
    pub fn from_texts<'a>(texts: impl IntoIterator<Item = (MessageFamily, &'a str)>) -> Result<Self> {
        let mut schemas = HashMap::new();
        for (family, text) in texts {
            let schema = Schema::parse_str(text).map_err(|e| DexError::InvalidSchema {
                family: family.to_string(),
                reason: e.to_string(),
            })?;
            schemas.insert(family, schema);
        }
        Ok(Self { schemas })
    }

    #[must_use]
    pub fn get(&self, family: MessageFamily) -> Option<&Schema> {
        self.schemas.get(&family)
    }
}
