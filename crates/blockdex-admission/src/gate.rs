//! Transaction admission gate.
//!
//! Every transaction passes through [`TransactionAdmissionGate::admit`]
//! before any message executes:
//!
//! ```text
//! validate basic ── memo gas ── per signer ─────────────────── fee ──────────── Accept
//!   (MalformedTx)   (OutOfGas)   account number, sequence,     first signer pays
//!                                key binding, signature,       check: funds only
//!                                sequence += 1, persist        deliver: deduct + accumulate
//! ```
//!
//! A signer's sequence increment is persisted as soon as that signer
//! verifies, so a later failure cannot make the same signatures replayable.

use blockdex_types::constants::{DEDUCT_FEES_COST, MEMO_COST_PER_BYTE, SIG_VERIFY_COST};
use blockdex_types::{Address, AdmissionConfig, DexError, Result, SignedTransaction, StdSignature};

use crate::gas::OutOfGas;
use crate::{ExecutionContext, FeeCalculatorRegistry, RejectReason, RunMode, Verdict};

/// Validates signed transactions and charges their fees.
#[derive(Debug)]
pub struct TransactionAdmissionGate {
    config: AdmissionConfig,
    fees: FeeCalculatorRegistry,
}

impl TransactionAdmissionGate {
    #[must_use]
    pub fn new(config: AdmissionConfig, fees: FeeCalculatorRegistry) -> Self {
        Self { config, fees }
    }

    #[must_use]
    pub fn chain_id(&self) -> &str {
        &self.config.chain_id
    }

    /// Admit `tx` against `ctx`.
    ///
    /// Returns `Ok(Verdict::Reject(..))` for anything wrong with the
    /// transaction and `Err` only for fatal conditions (missing fee
    /// calculator, amount overflow).
    pub fn admit(&self, tx: &SignedTransaction, ctx: &mut ExecutionContext<'_>) -> Result<Verdict> {
        ctx.start_tx(tx.fee.gas);

        if let Some(rejection) = self.validate_basic(tx) {
            return Ok(rejection);
        }

        if let Err(oog) = ctx
            .gas_meter_mut()
            .consume(memo_cost(&tx.memo), "memo")
        {
            return Ok(out_of_gas(&oog));
        }

        let signers = tx.signers();
        for (signer, sig) in signers.iter().zip(&tx.signatures) {
            let verdict = self.process_signer(tx, *signer, sig, ctx)?;
            if !verdict.is_accept() {
                return Ok(verdict);
            }
        }

        self.charge_fee(tx, ctx)
    }

    fn validate_basic(&self, tx: &SignedTransaction) -> Option<Verdict> {
        if tx.msgs.is_empty() {
            return Some(Verdict::reject(RejectReason::MalformedTx, "no messages"));
        }
        if tx.signatures.is_empty() {
            return Some(Verdict::reject(RejectReason::MalformedTx, "no signers"));
        }
        let signers = tx.signers();
        if tx.signatures.len() != signers.len() {
            return Some(Verdict::reject(
                RejectReason::MalformedTx,
                format!(
                    "wrong number of signers; expected {}, got {}",
                    signers.len(),
                    tx.signatures.len()
                ),
            ));
        }
        let memo_chars = tx.memo.chars().count();
        if memo_chars > self.config.max_memo_chars {
            return Some(Verdict::reject(
                RejectReason::MalformedTx,
                format!(
                    "maximum number of characters is {} but received {memo_chars} characters",
                    self.config.max_memo_chars
                ),
            ));
        }
        None
    }

    fn process_signer(
        &self,
        tx: &SignedTransaction,
        signer: Address,
        sig: &StdSignature,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<Verdict> {
        let Some(mut account) = ctx.store().account(&signer) else {
            return Ok(Verdict::reject(
                RejectReason::UnknownAddress,
                format!("account {signer} does not exist"),
            ));
        };

        if account.account_number != sig.account_number {
            return Ok(Verdict::reject(
                RejectReason::AccountNumberMismatch,
                format!(
                    "invalid account number; got {}, expected {}",
                    sig.account_number, account.account_number
                ),
            ));
        }

        if account.sequence != sig.sequence {
            return Ok(Verdict::reject(
                RejectReason::SequenceMismatch,
                format!(
                    "invalid sequence; got {}, expected {}",
                    sig.sequence, account.sequence
                ),
            ));
        }

        let pub_key = match (account.pub_key, sig.pub_key) {
            (Some(bound), _) => bound,
            (None, Some(presented)) => {
                if presented.address() != signer {
                    return Ok(Verdict::reject(
                        RejectReason::SignatureInvalid,
                        format!("public key does not match signer address {signer}"),
                    ));
                }
                presented
            }
            (None, None) => {
                return Ok(Verdict::reject(
                    RejectReason::SignatureInvalid,
                    format!("account {signer} has no bound key and the signature carries none"),
                ));
            }
        };

        if let Err(oog) = ctx.gas_meter_mut().consume(SIG_VERIFY_COST, "verify signature") {
            return Ok(out_of_gas(&oog));
        }

        let sign_bytes = tx.sign_bytes(&self.config.chain_id, sig.account_number, sig.sequence)?;
        if !pub_key.verify(&sign_bytes, &sig.signature) {
            return Ok(Verdict::reject(
                RejectReason::SignatureInvalid,
                format!("signature verification failed for {signer}"),
            ));
        }

        account.sequence += 1;
        account.pub_key = Some(pub_key);
        ctx.store_mut().set_account(account.clone());
        ctx.push_signer(account);
        Ok(Verdict::Accept)
    }

    fn charge_fee(&self, tx: &SignedTransaction, ctx: &mut ExecutionContext<'_>) -> Result<Verdict> {
        // validate_basic guarantees at least one message.
        let Some(primary) = tx.msgs.first() else {
            return Ok(Verdict::reject(RejectReason::MalformedTx, "no messages"));
        };
        let fee = self.fees.calculate(primary)?;
        if !fee.is_chargeable() {
            return Ok(Verdict::Accept);
        }

        let mode = ctx.mode();
        let height = ctx.height();
        let Some(payer) = ctx.signers().first() else {
            return Err(DexError::Internal("admitted transaction without signers".into()));
        };
        let remaining = payer
            .coins
            .checked_minus(&fee.tokens)
            .ok_or_else(|| DexError::AmountOverflow {
                context: "fee deduction".to_string(),
            })?;
        if !remaining.is_not_negative() {
            return Ok(Verdict::reject(
                RejectReason::InsufficientFunds,
                format!("insufficient fee; got {}, required {}", payer.coins, fee.tokens),
            ));
        }

        if mode == RunMode::Check {
            return Ok(Verdict::Accept);
        }

        if let Err(oog) = ctx.gas_meter_mut().consume(DEDUCT_FEES_COST, "deduct fee") {
            return Ok(out_of_gas(&oog));
        }
        let Some(payer) = ctx.signers_mut().first_mut() else {
            return Err(DexError::Internal("admitted transaction without signers".into()));
        };
        payer.coins = remaining;
        let payer = payer.clone();
        ctx.store_mut().set_account(payer.clone());
        ctx.block_fee_mut().merge(height, payer.address, &fee)?;
        tracing::debug!(
            payer = %payer.address,
            fee = %fee.tokens,
            mode = %fee.mode,
            height,
            "Fee charged"
        );
        Ok(Verdict::Accept)
    }
}

fn memo_cost(memo: &str) -> u64 {
    u64::try_from(memo.len()).map_or(u64::MAX, |len| len.saturating_mul(MEMO_COST_PER_BYTE))
}

fn out_of_gas(oog: &OutOfGas) -> Verdict {
    Verdict::reject(
        RejectReason::OutOfGas,
        format!(
            "out of gas in {}; limit {}, consumed {}",
            oog.descriptor, oog.limit, oog.consumed
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee_registry::{fixed, free};
    use crate::{AccountStore, BlockFeeAccumulator, MemoryAccountStore};
    use blockdex_types::test_helpers::{address_of, funded_account, signing_key};
    use blockdex_types::{Coins, FeeMode, Msg, Output, SendMsg, StdFee, TxBuilder};

    const CHAIN: &str = "test-chain";

    fn gate(fee: Coins, mode: FeeMode) -> TransactionAdmissionGate {
        let config = AdmissionConfig {
            chain_id: CHAIN.into(),
            ..AdmissionConfig::default()
        };
        let registry = FeeCalculatorRegistry::new()
            .with("send", fixed(fee, mode))
            .with("orderNew", free());
        TransactionAdmissionGate::new(config, registry)
    }

    fn send(from: u8, to: u8) -> Msg {
        Msg::Send(SendMsg {
            from: address_of(from),
            outputs: vec![Output {
                address: address_of(to),
                coins: Coins::of("BNB", 1),
            }],
        })
    }

    fn store_with(accounts: &[(u8, u64, i64)]) -> MemoryAccountStore {
        let mut store = MemoryAccountStore::new();
        for (n, number, bnb) in accounts {
            store.set_account(funded_account(*n, *number, &[("BNB", *bnb)]));
        }
        store
    }

    #[test]
    fn accepted_tx_bumps_sequence_and_binds_key() {
        let gate = gate(Coins::of("BNB", 10), FeeMode::SenderPays);
        let mut store = store_with(&[(1, 0, 100)]);
        let mut fees = BlockFeeAccumulator::new();
        let key = signing_key(1);
        let tx = TxBuilder::new(CHAIN).msg(send(1, 2)).sign(&[(&key, 0, 0)]).unwrap();

        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        assert_eq!(gate.admit(&tx, &mut ctx).unwrap(), Verdict::Accept);
        assert_eq!(ctx.signers().len(), 1);

        let acc = store.account(&address_of(1)).unwrap();
        assert_eq!(acc.sequence, 1);
        assert!(acc.pub_key.is_some());
        assert_eq!(acc.coins, Coins::of("BNB", 90));
        assert_eq!(fees.total(), &Coins::of("BNB", 10));
    }

    #[test]
    fn malformed_transactions() {
        let gate = gate(Coins::new(), FeeMode::Free);
        let mut store = store_with(&[(1, 0, 100)]);
        let mut fees = BlockFeeAccumulator::new();
        let key = signing_key(1);

        let unsigned = TxBuilder::new(CHAIN).msg(send(1, 2)).sign(&[]).unwrap();
        let two_sigs = TxBuilder::new(CHAIN)
            .msg(send(1, 2))
            .sign(&[(&key, 0, 0), (&key, 0, 0)])
            .unwrap();
        let long_memo = TxBuilder::new(CHAIN)
            .msg(send(1, 2))
            .memo("x".repeat(101))
            .sign(&[(&key, 0, 0)])
            .unwrap();

        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        for tx in [unsigned, two_sigs, long_memo] {
            let verdict = gate.admit(&tx, &mut ctx).unwrap();
            assert_eq!(verdict.reason(), Some(RejectReason::MalformedTx), "Got: {verdict:?}");
        }
        assert_eq!(store.account(&address_of(1)).unwrap().sequence, 0);
    }

    #[test]
    fn unknown_signer_is_rejected() {
        let gate = gate(Coins::new(), FeeMode::Free);
        let mut store = MemoryAccountStore::new();
        let mut fees = BlockFeeAccumulator::new();
        let key = signing_key(1);
        let tx = TxBuilder::new(CHAIN).msg(send(1, 2)).sign(&[(&key, 0, 0)]).unwrap();
        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        assert_eq!(
            gate.admit(&tx, &mut ctx).unwrap().reason(),
            Some(RejectReason::UnknownAddress)
        );
    }

    #[test]
    fn account_number_checked_before_sequence() {
        let gate = gate(Coins::new(), FeeMode::Free);
        let mut store = store_with(&[(1, 5, 100)]);
        let mut fees = BlockFeeAccumulator::new();
        let key = signing_key(1);
        let tx = TxBuilder::new(CHAIN).msg(send(1, 2)).sign(&[(&key, 4, 9)]).unwrap();
        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        assert_eq!(
            gate.admit(&tx, &mut ctx).unwrap().reason(),
            Some(RejectReason::AccountNumberMismatch)
        );
    }

    #[test]
    fn key_of_another_address_is_rejected() {
        let gate = gate(Coins::new(), FeeMode::Free);
        let mut store = store_with(&[(1, 0, 100)]);
        let mut fees = BlockFeeAccumulator::new();
        // Signed by key 2 on behalf of address 1.
        let impostor = signing_key(2);
        let tx = TxBuilder::new(CHAIN).msg(send(1, 2)).sign(&[(&impostor, 0, 0)]).unwrap();
        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        assert_eq!(
            gate.admit(&tx, &mut ctx).unwrap().reason(),
            Some(RejectReason::SignatureInvalid)
        );
        assert_eq!(store.account(&address_of(1)).unwrap().sequence, 0);
    }

    #[test]
    fn signature_for_other_chain_is_rejected() {
        let gate = gate(Coins::new(), FeeMode::Free);
        let mut store = store_with(&[(1, 0, 100)]);
        let mut fees = BlockFeeAccumulator::new();
        let key = signing_key(1);
        let tx = TxBuilder::new("other-chain").msg(send(1, 2)).sign(&[(&key, 0, 0)]).unwrap();
        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        assert_eq!(
            gate.admit(&tx, &mut ctx).unwrap().reason(),
            Some(RejectReason::SignatureInvalid)
        );
    }

    #[test]
    fn earlier_signer_stays_advanced_when_later_signer_fails() {
        let gate = gate(Coins::new(), FeeMode::Free);
        let mut store = store_with(&[(1, 0, 100), (2, 1, 100)]);
        let mut fees = BlockFeeAccumulator::new();
        let (k1, k2) = (signing_key(1), signing_key(2));
        let tx = TxBuilder::new(CHAIN)
            .msg(send(1, 3))
            .msg(send(2, 3))
            .sign(&[(&k1, 0, 0), (&k2, 1, 7)])
            .unwrap();
        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        assert_eq!(
            gate.admit(&tx, &mut ctx).unwrap().reason(),
            Some(RejectReason::SequenceMismatch)
        );
        assert_eq!(store.account(&address_of(1)).unwrap().sequence, 1);
        assert_eq!(store.account(&address_of(2)).unwrap().sequence, 0);
    }

    #[test]
    fn check_mode_verifies_funds_without_deducting() {
        let gate = gate(Coins::of("BNB", 10), FeeMode::SenderPays);
        let mut store = store_with(&[(1, 0, 100), (2, 1, 5)]);
        let mut fees = BlockFeeAccumulator::new();
        let (k1, k2) = (signing_key(1), signing_key(2));

        let ok = TxBuilder::new(CHAIN).msg(send(1, 2)).sign(&[(&k1, 0, 0)]).unwrap();
        let poor = TxBuilder::new(CHAIN).msg(send(2, 1)).sign(&[(&k2, 1, 0)]).unwrap();

        let mut ctx = ExecutionContext::new(RunMode::Check, 1, &mut store, &mut fees);
        assert!(gate.admit(&ok, &mut ctx).unwrap().is_accept());
        assert_eq!(
            gate.admit(&poor, &mut ctx).unwrap().reason(),
            Some(RejectReason::InsufficientFunds)
        );
        assert_eq!(store.account(&address_of(1)).unwrap().coins, Coins::of("BNB", 100));
        assert!(fees.total().is_zero());
    }

    #[test]
    fn gas_limit_is_enforced() {
        let gate = gate(Coins::new(), FeeMode::Free);
        let mut store = store_with(&[(1, 0, 100)]);
        let mut fees = BlockFeeAccumulator::new();
        let key = signing_key(1);
        let tx = TxBuilder::new(CHAIN)
            .msg(send(1, 2))
            .fee(StdFee {
                amount: Coins::new(),
                mode: FeeMode::Free,
                gas: 50,
            })
            .sign(&[(&key, 0, 0)])
            .unwrap();
        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        assert_eq!(gate.admit(&tx, &mut ctx).unwrap().reason(), Some(RejectReason::OutOfGas));
    }

    #[test]
    fn missing_fee_calculator_is_fatal() {
        let gate = TransactionAdmissionGate::new(
            AdmissionConfig {
                chain_id: CHAIN.into(),
                ..AdmissionConfig::default()
            },
            FeeCalculatorRegistry::new(),
        );
        let mut store = store_with(&[(1, 0, 100)]);
        let mut fees = BlockFeeAccumulator::new();
        let key = signing_key(1);
        let tx = TxBuilder::new(CHAIN).msg(send(1, 2)).sign(&[(&key, 0, 0)]).unwrap();
        let mut ctx = ExecutionContext::new(RunMode::Deliver, 1, &mut store, &mut fees);
        let err = gate.admit(&tx, &mut ctx).unwrap_err();
        assert!(matches!(err, DexError::MissingFeeCalculator { .. }), "Got: {err}");
    }
}
