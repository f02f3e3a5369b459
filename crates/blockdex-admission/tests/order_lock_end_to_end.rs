//! End-to-end order locking: an account places orders through mempool
//! checks and block delivery, and its free/locked balances follow.

use blockdex_admission::fee_registry::free;
use blockdex_admission::{ChainApp, FeeCalculatorRegistry, RejectReason, TransactionAdmissionGate};
use blockdex_types::constants::FIXED_POINT_SCALE;
use blockdex_types::test_helpers::{address_of, funded_account, signing_key};
use blockdex_types::{
    AdmissionConfig, CancelOrderMsg, Msg, NewOrderMsg, OrderStatus, Side, SignedTransaction,
    TimeInForce, TxBuilder,
};

const CHAIN: &str = "e2e-chain";
const E8: i64 = FIXED_POINT_SCALE;
const A: u8 = 1;

fn app() -> ChainApp {
    let registry = FeeCalculatorRegistry::new()
        .with("orderNew", free())
        .with("orderCancel", free());
    let config = AdmissionConfig {
        chain_id: CHAIN.into(),
        ..AdmissionConfig::default()
    };
    let mut app = ChainApp::new(TransactionAdmissionGate::new(config, registry));
    app.init_genesis([funded_account(A, 0, &[("BNB", 500 * E8), ("BTC", 200 * E8)])]);
    app
}

fn order_tx(id: &str, side: Side, price: i64, qty: i64, sequence: u64) -> SignedTransaction {
    let msg = Msg::NewOrder(NewOrderMsg {
        sender: address_of(A),
        id: id.into(),
        symbol: "BTC_BNB".into(),
        side,
        price,
        quantity: qty,
        time_in_force: TimeInForce::Gte,
    });
    TxBuilder::new(CHAIN)
        .msg(msg)
        .sign(&[(&signing_key(A), 0, sequence)])
        .unwrap()
}

fn balances(app: &ChainApp, check: bool, asset: &str) -> (i64, i64) {
    let account = if check {
        app.check_account(&address_of(A))
    } else {
        app.account(&address_of(A))
    }
    .unwrap();
    (
        account.coins.amount_of(asset),
        account.locked_coins.amount_of(asset),
    )
}

#[test]
fn check_tx_locks_only_what_is_available() {
    let mut app = app();

    let too_big = app.check_tx(&order_tx("a-1", Side::Buy, 355 * E8, 100 * E8, 0)).unwrap();
    assert_eq!(too_big.reason(), Some(RejectReason::InsufficientFunds), "Got: {too_big:?}");
    assert_eq!(balances(&app, true, "BNB"), (500 * E8, 0));
    assert_eq!(balances(&app, true, "BTC"), (200 * E8, 0));

    // The rejected order still consumed sequence 0.
    let fits = app.check_tx(&order_tx("a-2", Side::Buy, 355 * E8, E8, 1)).unwrap();
    assert!(fits.is_accept(), "Got: {fits:?}");
    assert_eq!(balances(&app, true, "BNB"), (145 * E8, 355 * E8));
    assert_eq!(balances(&app, true, "BTC"), (200 * E8, 0));

    // Deliver state is untouched by checks.
    assert_eq!(balances(&app, false, "BNB"), (500 * E8, 0));
}

#[test]
fn delivered_orders_lock_and_emit_events() {
    let mut app = app();
    app.begin_block(10, 10_000).unwrap();

    let rejected = app.deliver_tx(&order_tx("a-1", Side::Buy, 355 * E8, 100 * E8, 0)).unwrap();
    assert_eq!(rejected.reason(), Some(RejectReason::InsufficientFunds));
    assert!(app.deliver_tx(&order_tx("a-2", Side::Buy, 355 * E8, E8, 1)).unwrap().is_accept());
    assert!(app.deliver_tx(&order_tx("a-3", Side::Sell, 400 * E8, 200 * E8, 2)).unwrap().is_accept());

    assert_eq!(balances(&app, false, "BNB"), (145 * E8, 355 * E8));
    assert_eq!(balances(&app, false, "BTC"), (0, 200 * E8));
    assert_eq!(app.dex().open_orders(), 2);

    let proposer = address_of(99);
    let out = app.end_block(proposer, &[proposer]).unwrap();
    let statuses: Vec<(&str, OrderStatus)> =
        out.orders.iter().map(|o| (o.order_id.as_str(), o.status)).collect();
    assert_eq!(statuses, vec![("a-2", OrderStatus::Ack), ("a-3", OrderStatus::Ack)]);
    assert_eq!(out.accounts.len(), 1);
    assert!(out.fee.fee.is_zero());
    app.commit();
    assert_eq!(balances(&app, true, "BTC"), (0, 200 * E8));
}

#[test]
fn cancel_releases_lock_in_next_block() {
    let mut app = app();
    app.begin_block(1, 1_000).unwrap();
    assert!(app.deliver_tx(&order_tx("a-1", Side::Buy, 355 * E8, E8, 0)).unwrap().is_accept());
    app.end_block(address_of(99), &[]).unwrap();
    app.commit();

    app.begin_block(2, 2_000).unwrap();
    let cancel = TxBuilder::new(CHAIN)
        .msg(Msg::CancelOrder(CancelOrderMsg {
            sender: address_of(A),
            symbol: "BTC_BNB".into(),
            ref_id: "a-1".into(),
        }))
        .sign(&[(&signing_key(A), 0, 1)])
        .unwrap();
    assert!(app.deliver_tx(&cancel).unwrap().is_accept());
    let out = app.end_block(address_of(99), &[]).unwrap();

    assert_eq!(balances(&app, false, "BNB"), (500 * E8, 0));
    assert_eq!(out.orders.len(), 1);
    assert_eq!(out.orders[0].status, OrderStatus::Canceled);
    assert_eq!(out.orders[0].order_creation_time, 1_000);
    assert_eq!(out.orders[0].transaction_time, 2_000);
}
