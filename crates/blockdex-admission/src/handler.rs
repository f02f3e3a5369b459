//! Message handlers: order locks, cancels, and transfers.
//!
//! Handlers run after admission, against a [`CacheStore`](crate::CacheStore)
//! so a failing message discards the whole transaction's balance changes.
//! Book mutations are staged in [`TxEffects`] and applied only once every
//! message of the transaction succeeded.

use std::collections::BTreeMap;

use blockdex_types::constants::FIXED_POINT_SCALE;
use blockdex_types::{
    Address, CancelOrderMsg, Coin, Coins, DexError, Msg, NewOrderMsg, OrderChange, OrderStatus,
    OrderType, Receiver, Result, SendMsg, Side, TimeInForce, Transfer,
};

use crate::AccountStore;

/// Block-level facts a handler stamps onto the events it emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEnv {
    pub height: i64,
    pub timestamp: i64,
    pub tx_hash: String,
}

/// An order resting on the book, with the funds backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrder {
    pub id: String,
    pub owner: Address,
    pub symbol: String,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
    pub time_in_force: TimeInForce,
    pub locked: Coin,
    pub created_at: i64,
    pub tx_hash: String,
}

impl OpenOrder {
    fn change(&self, status: OrderStatus, env: &TxEnv) -> OrderChange {
        OrderChange {
            order_id: self.id.clone(),
            symbol: self.symbol.clone(),
            owner: self.owner,
            side: self.side,
            order_type: OrderType::Limit,
            time_in_force: self.time_in_force,
            price: self.price,
            qty: self.quantity,
            status,
            last_executed_price: 0,
            last_executed_qty: 0,
            cum_qty: 0,
            fee: String::new(),
            trade_id: String::new(),
            order_creation_time: self.created_at,
            transaction_time: env.timestamp,
            tx_hash: env.tx_hash.clone(),
        }
    }
}

/// Staged results of one transaction's messages.
#[derive(Debug, Clone, Default)]
pub struct TxEffects {
    pub opened: Vec<OpenOrder>,
    pub closed: Vec<OrderKey>,
    pub orders: Vec<OrderChange>,
    pub transfers: Vec<Transfer>,
}

/// Order ids are client-chosen, so they are unique per owner only.
type OrderKey = (Address, String);

/// Open-order book keeper.
#[derive(Debug, Clone, Default)]
pub struct DexKeeper {
    open: BTreeMap<OrderKey, OpenOrder>,
}

impl DexKeeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn open_order(&self, owner: &Address, id: &str) -> Option<&OpenOrder> {
        self.open.get(&(*owner, id.to_string()))
    }

    #[must_use]
    pub fn open_orders(&self) -> usize {
        self.open.len()
    }

    /// Execute one message, staging its effects.
    pub fn handle(
        &self,
        msg: &Msg,
        store: &mut dyn AccountStore,
        env: &TxEnv,
        effects: &mut TxEffects,
    ) -> Result<()> {
        match msg {
            Msg::NewOrder(m) => self.new_order(m, store, env, effects),
            Msg::CancelOrder(m) => self.cancel_order(m, store, env, effects),
            Msg::Send(m) => send(m, store, env, effects),
        }
    }

    /// Commit staged effects of a successful transaction.
    pub fn apply(&mut self, effects: &TxEffects) {
        for order in &effects.opened {
            self.open.insert((order.owner, order.id.clone()), order.clone());
        }
        for key in &effects.closed {
            self.open.remove(key);
        }
    }

    fn new_order(
        &self,
        msg: &NewOrderMsg,
        store: &mut dyn AccountStore,
        env: &TxEnv,
        effects: &mut TxEffects,
    ) -> Result<()> {
        let (base, quote) = split_symbol(&msg.symbol)?;
        if msg.price <= 0 || msg.quantity <= 0 {
            return Err(invalid(format!(
                "price and quantity must be positive; got {} x {}",
                msg.price, msg.quantity
            )));
        }
        let key = (msg.sender, msg.id.clone());
        let staged = effects
            .opened
            .iter()
            .any(|o| o.owner == msg.sender && o.id == msg.id);
        if staged || self.open.contains_key(&key) {
            return Err(DexError::DuplicateOrder(msg.id.clone()));
        }

        let locked = match msg.side {
            Side::Buy => Coin::new(quote, notional(msg.price, msg.quantity)?),
            Side::Sell => Coin::new(base, msg.quantity),
        };

        let mut account = store
            .account(&msg.sender)
            .ok_or(DexError::UnknownAddress(msg.sender))?;
        let available = account.coins.amount_of(&locked.denom);
        if available < locked.amount {
            return Err(DexError::InsufficientFunds {
                reason: format!(
                    "do not have enough token to lock; need {locked}, have {available}"
                ),
            });
        }
        let lock = Coins::of(&locked.denom, locked.amount);
        account.coins = account
            .coins
            .checked_minus(&lock)
            .ok_or_else(|| invalid("lock amount overflows".to_string()))?;
        account.locked_coins = account
            .locked_coins
            .checked_plus(&lock)
            .ok_or_else(|| invalid("lock amount overflows".to_string()))?;
        store.set_account(account);

        let order = OpenOrder {
            id: msg.id.clone(),
            owner: msg.sender,
            symbol: msg.symbol.clone(),
            side: msg.side,
            price: msg.price,
            quantity: msg.quantity,
            time_in_force: msg.time_in_force,
            locked,
            created_at: env.timestamp,
            tx_hash: env.tx_hash.clone(),
        };
        tracing::debug!(order = %order.id, symbol = %order.symbol, side = %order.side, "Order accepted");
        effects.orders.push(order.change(OrderStatus::Ack, env));
        effects.opened.push(order);
        Ok(())
    }

    fn cancel_order(
        &self,
        msg: &CancelOrderMsg,
        store: &mut dyn AccountStore,
        env: &TxEnv,
        effects: &mut TxEffects,
    ) -> Result<()> {
        let key = (msg.sender, msg.ref_id.clone());
        if effects.closed.contains(&key) {
            return Err(DexError::OrderNotFound(msg.ref_id.clone()));
        }
        let order = self
            .open
            .get(&key)
            .or_else(|| {
                effects
                    .opened
                    .iter()
                    .find(|o| o.owner == msg.sender && o.id == msg.ref_id)
            })
            .cloned()
            .ok_or_else(|| DexError::OrderNotFound(msg.ref_id.clone()))?;
        if order.symbol != msg.symbol {
            return Err(invalid(format!(
                "order {} trades {}, not {}",
                order.id, order.symbol, msg.symbol
            )));
        }

        let mut account = store
            .account(&order.owner)
            .ok_or(DexError::UnknownAddress(order.owner))?;
        let unlock = Coins::of(&order.locked.denom, order.locked.amount);
        let still_locked = account
            .locked_coins
            .checked_minus(&unlock)
            .ok_or_else(|| invalid("unlock amount overflows".to_string()))?;
        if !still_locked.is_not_negative() {
            return Err(DexError::Internal(format!(
                "locked balance of {} below order {} lock",
                order.owner, order.id
            )));
        }
        account.locked_coins = still_locked;
        account.coins = account
            .coins
            .checked_plus(&unlock)
            .ok_or_else(|| invalid("unlock amount overflows".to_string()))?;
        store.set_account(account);

        effects.orders.push(order.change(OrderStatus::Canceled, env));
        effects.closed.push(key);
        Ok(())
    }
}

fn send(msg: &SendMsg, store: &mut dyn AccountStore, env: &TxEnv, effects: &mut TxEffects) -> Result<()> {
    if msg.outputs.is_empty() {
        return Err(DexError::InvalidMessage {
            reason: "send without outputs".into(),
        });
    }
    let mut total = Coins::new();
    for output in &msg.outputs {
        if output.coins.is_zero() || !output.coins.is_not_negative() {
            return Err(DexError::InvalidMessage {
                reason: format!("output to {} must be positive", output.address),
            });
        }
        total = total.checked_plus(&output.coins).ok_or_else(|| overflow("send"))?;
    }

    let mut sender = store.account(&msg.from).ok_or(DexError::UnknownAddress(msg.from))?;
    let remaining = sender.coins.checked_minus(&total).ok_or_else(|| overflow("send"))?;
    if !remaining.is_not_negative() {
        return Err(DexError::InsufficientFunds {
            reason: format!("{} has {}, needs {total}", msg.from, sender.coins),
        });
    }
    sender.coins = remaining;
    store.set_account(sender);

    for output in &msg.outputs {
        let mut receiver = match store.account(&output.address) {
            Some(account) => account,
            None => store.create_account(output.address),
        };
        receiver.coins = receiver
            .coins
            .checked_plus(&output.coins)
            .ok_or_else(|| overflow("receive"))?;
        store.set_account(receiver);
    }

    effects.transfers.push(Transfer {
        tx_hash: env.tx_hash.clone(),
        from: msg.from,
        to: msg
            .outputs
            .iter()
            .map(|o| Receiver {
                address: o.address,
                coins: o.coins.clone(),
            })
            .collect(),
    });
    Ok(())
}

/// `BASE_QUOTE` → `(BASE, QUOTE)`.
fn split_symbol(symbol: &str) -> Result<(&str, &str)> {
    match symbol.split_once('_') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() && base != quote => {
            Ok((base, quote))
        }
        _ => Err(invalid(format!("malformed symbol {symbol:?}"))),
    }
}

/// Quote amount of `price × quantity` in fixed point.
fn notional(price: i64, quantity: i64) -> Result<i64> {
    let raw = i128::from(price) * i128::from(quantity) / i128::from(FIXED_POINT_SCALE);
    let amount = i64::try_from(raw).map_err(|_| invalid("notional overflows".to_string()))?;
    if amount == 0 {
        return Err(invalid("notional rounds to zero".to_string()));
    }
    Ok(amount)
}

fn invalid(reason: String) -> DexError {
    DexError::InvalidOrder { reason }
}

/// Overflow on message-supplied amounts. Rejects the transaction.
fn overflow(context: &str) -> DexError {
    DexError::InvalidMessage {
        reason: format!("{context} amount overflows"),
    }
}
