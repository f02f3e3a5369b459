//! Block-level admission properties: replay protection, free fees, and
//! exact per-block fee accounting, driven through `ChainApp`.

use blockdex_admission::fee_registry::{fixed, free};
use blockdex_admission::{ChainApp, FeeCalculatorRegistry, RejectReason, TransactionAdmissionGate, Verdict};
use blockdex_types::test_helpers::{address_of, funded_account, signing_key};
use blockdex_types::{
    AdmissionConfig, Coins, Fee, FeeMode, Msg, Output, SendMsg, SignedTransaction, TxBuilder,
};

const CHAIN: &str = "prop-chain";
const PROPOSER_KEY: u8 = 200;

fn app(registry: FeeCalculatorRegistry) -> ChainApp {
    let config = AdmissionConfig {
        chain_id: CHAIN.into(),
        ..AdmissionConfig::default()
    };
    let mut app = ChainApp::new(TransactionAdmissionGate::new(config, registry));
    app.init_genesis([
        funded_account(1, 0, &[("BNB", 1_000_000)]),
        funded_account(2, 1, &[("BNB", 1_000_000)]),
        funded_account(3, 2, &[("BNB", 1_000_000)]),
    ]);
    app
}

fn send_tx(from: u8, account_number: u64, sequence: u64, amount: i64) -> SignedTransaction {
    let msg = Msg::Send(SendMsg {
        from: address_of(from),
        outputs: vec![Output {
            address: address_of(9),
            coins: Coins::of("BNB", amount),
        }],
    });
    TxBuilder::new(CHAIN)
        .msg(msg)
        .sign(&[(&signing_key(from), account_number, sequence)])
        .unwrap()
}

/// Fee equal to a tenth of the BNB being sent.
fn tithe() -> FeeCalculatorRegistry {
    FeeCalculatorRegistry::new().with(
        "send",
        Box::new(|msg| match msg {
            Msg::Send(m) => {
                let sent: i64 = m.outputs.iter().map(|o| o.coins.amount_of("BNB")).sum();
                Fee::new(Coins::of("BNB", sent / 10), FeeMode::SenderPays)
            }
            _ => Fee::free(),
        }),
    )
}

#[test]
fn sequence_advances_by_one_and_replay_is_rejected() {
    let mut app = app(FeeCalculatorRegistry::new().with("send", free()));
    app.begin_block(1, 1_000).unwrap();

    for (key, number) in [(1u8, 0u64), (2, 1), (3, 2)] {
        let before = app.account(&address_of(key)).unwrap().sequence;
        let tx = send_tx(key, number, before, 10);
        assert_eq!(app.deliver_tx(&tx).unwrap(), Verdict::Accept);
        assert_eq!(app.account(&address_of(key)).unwrap().sequence, before + 1);

        let replay = app.deliver_tx(&tx).unwrap();
        assert_eq!(replay.reason(), Some(RejectReason::SequenceMismatch), "Got: {replay:?}");
        assert_eq!(app.account(&address_of(key)).unwrap().sequence, before + 1);
    }
}

#[test]
fn free_and_zero_fees_charge_nothing() {
    let registry = FeeCalculatorRegistry::new().with("send", fixed(Coins::of("BNB", 50), FeeMode::Free));
    let mut app = app(registry);
    app.begin_block(1, 1_000).unwrap();
    assert!(app.deliver_tx(&send_tx(1, 0, 0, 10)).unwrap().is_accept());

    let mut zero = self::app(FeeCalculatorRegistry::new().with(
        "send",
        fixed(Coins::new(), FeeMode::SharedByValidators),
    ));
    zero.begin_block(1, 1_000).unwrap();
    assert!(zero.deliver_tx(&send_tx(1, 0, 0, 10)).unwrap().is_accept());

    for app in [&app, &zero] {
        // Only the transfer itself left the account.
        assert_eq!(app.account(&address_of(1)).unwrap().coins.amount_of("BNB"), 999_990);
        assert!(app.block_fee().total().is_zero());
        assert_eq!(app.block_fee().mode(), FeeMode::Free);
    }
}

#[test]
fn block_fee_total_is_exact_sum_and_resets_next_block() {
    let mut app = app(tithe());
    app.begin_block(1, 1_000).unwrap();

    let amounts = [10, 1_230, 77, 999, 5_000, 31];
    let mut expected = 0;
    for (i, amount) in amounts.iter().enumerate() {
        let key = u8::try_from(i % 3).unwrap() + 1;
        let number = u64::from(key - 1);
        let seq = app.account(&address_of(key)).unwrap().sequence;
        assert!(app.deliver_tx(&send_tx(key, number, seq, *amount)).unwrap().is_accept());
        expected += amount / 10;
    }

    let proposer = address_of(PROPOSER_KEY);
    let out = app.end_block(proposer, &[proposer]).unwrap();
    assert_eq!(out.fee.fee, Coins::of("BNB", expected));
    assert_eq!(out.fee.validators, vec![proposer]);
    assert_eq!(out.transfers.len(), amounts.len());
    app.commit();

    // The next block starts from zero.
    app.begin_block(2, 2_000).unwrap();
    assert!(app.block_fee().total().is_zero());
    let seq = app.account(&address_of(1)).unwrap().sequence;
    assert!(app.deliver_tx(&send_tx(1, 0, seq, 100)).unwrap().is_accept());
    let out = app.end_block(proposer, &[proposer]).unwrap();
    assert_eq!(out.height, 2);
    assert_eq!(out.fee.fee, Coins::of("BNB", 10));
}

#[test]
fn accounts_event_reports_fee_paid_in_block() {
    let mut app = app(tithe());
    app.begin_block(5, 5_000).unwrap();
    assert!(app.deliver_tx(&send_tx(1, 0, 0, 500)).unwrap().is_accept());
    assert!(app.deliver_tx(&send_tx(1, 0, 1, 300)).unwrap().is_accept());

    let proposer = address_of(PROPOSER_KEY);
    let out = app.end_block(proposer, &[proposer]).unwrap();
    let payer = out
        .accounts
        .iter()
        .find(|a| a.owner == address_of(1))
        .unwrap();
    assert_eq!(payer.fee, "BNB:80");
    assert_eq!(payer.balances[0].free, 1_000_000 - 800 - 80);
    assert!(out.accounts.iter().any(|a| a.owner == address_of(9)));
}

#[test]
fn overflowing_send_is_rejected_and_still_reported() {
    let registry = FeeCalculatorRegistry::new().with("send", fixed(Coins::of("BNB", 50), FeeMode::SenderPays));
    let mut app = app(registry);
    app.begin_block(4, 4_000).unwrap();

    let msg = Msg::Send(SendMsg {
        from: address_of(1),
        outputs: vec![
            Output {
                address: address_of(9),
                coins: Coins::of("BNB", i64::MAX),
            },
            Output {
                address: address_of(8),
                coins: Coins::of("BNB", 1),
            },
        ],
    });
    let tx = TxBuilder::new(CHAIN)
        .msg(msg)
        .sign(&[(&signing_key(1), 0, 0)])
        .unwrap();
    let verdict = app.deliver_tx(&tx).unwrap();
    assert_eq!(verdict.reason(), Some(RejectReason::MalformedTx), "Got: {verdict:?}");

    // Admission already consumed the sequence and charged the fee.
    assert_eq!(app.account(&address_of(1)).unwrap().sequence, 1);
    assert!(app.deliver_tx(&send_tx(1, 0, 1, 10)).unwrap().is_accept());

    let proposer = address_of(PROPOSER_KEY);
    let out = app.end_block(proposer, &[proposer]).unwrap();
    let payer = out
        .accounts
        .iter()
        .find(|a| a.owner == address_of(1))
        .unwrap();
    assert_eq!(payer.fee, "BNB:100");
    assert_eq!(payer.balances[0].free, 1_000_000 - 10 - 100);
    assert_eq!(out.transfers.len(), 1);
    assert!(!out.accounts.iter().any(|a| a.owner == address_of(8)));
}

#[test]
fn deliver_outside_block_is_error() {
    let mut app = app(tithe());
    assert!(app.deliver_tx(&send_tx(1, 0, 0, 10)).is_err());
    assert!(app.end_block(address_of(1), &[]).is_err());
}
